//! Dedicated servers.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{lenient_string, nullable_vec, RequestBody, RobotClient};
use crate::error::ProviderError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSubnet {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mask: String,
}

/// A dedicated server as returned by `GET /server/{number}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotServer {
    #[serde(deserialize_with = "lenient_string")]
    pub server_ip: String,
    #[serde(deserialize_with = "lenient_string")]
    pub server_ipv6_net: String,
    pub server_number: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub server_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub product: String,
    #[serde(deserialize_with = "lenient_string")]
    pub dc: String,
    #[serde(deserialize_with = "lenient_string")]
    pub traffic: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    pub cancelled: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub paid_until: String,
    #[serde(deserialize_with = "nullable_vec")]
    pub ip: Vec<String>,
    #[serde(deserialize_with = "nullable_vec")]
    pub subnet: Vec<ServerSubnet>,
    pub linked_storagebox: Option<u64>,
    pub reset: bool,
    pub rescue: bool,
    pub vnc: bool,
    pub windows: bool,
    pub plesk: bool,
    pub cpanel: bool,
    pub wol: bool,
    pub hot_swap: bool,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: RobotServer,
}

impl RobotClient {
    pub async fn get_server(&self, server_number: u64) -> Result<RobotServer, ProviderError> {
        let envelope: ServerEnvelope = self
            .call_json(
                Method::GET,
                &format!("/server/{}", server_number),
                RequestBody::Empty,
                &[StatusCode::OK],
            )
            .await?;
        Ok(envelope.server)
    }

    pub async fn rename_server(&self, server_number: u64, name: &str) -> Result<RobotServer, ProviderError> {
        let envelope: ServerEnvelope = self
            .call_json(
                Method::POST,
                &format!("/server/{}", server_number),
                RequestBody::Json(json!({ "server_name": name })),
                &[StatusCode::OK],
            )
            .await?;
        Ok(envelope.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_server() {
        let body = r#"{
            "server": {
                "server_ip": "123.123.123.123",
                "server_ipv6_net": "2a01:f48:111:4221::",
                "server_number": 321,
                "server_name": "server1",
                "product": "DS 3000",
                "dc": "NBG1-DC1",
                "traffic": "5 TB",
                "status": "ready",
                "cancelled": false,
                "paid_until": "2010-09-02",
                "ip": ["123.123.123.123"],
                "subnet": [{"ip": "2a01:4f8:111:4221::", "mask": "64"}],
                "reset": true,
                "rescue": true,
                "vnc": true,
                "windows": true,
                "plesk": true,
                "cpanel": true,
                "wol": true,
                "hot_swap": true,
                "linked_storagebox": 12345
            }
        }"#;
        let server = serde_json::from_str::<ServerEnvelope>(body).unwrap().server;

        assert_eq!(server.server_number, 321);
        assert_eq!(server.dc, "NBG1-DC1");
        assert_eq!(server.subnet[0].mask, "64");
        assert_eq!(server.linked_storagebox, Some(12345));
        assert!(server.hot_swap);
    }

    #[test]
    fn test_decode_server_with_nulls() {
        let body = r#"{"server": {"server_ip": null, "server_number": 5, "subnet": null, "linked_storagebox": null}}"#;
        let server = serde_json::from_str::<ServerEnvelope>(body).unwrap().server;

        assert_eq!(server.server_ip, "");
        assert!(server.subnet.is_empty());
        assert!(server.linked_storagebox.is_none());
        assert!(!server.reset);
    }
}
