//! SSH public keys stored in the Robot account.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::{lenient_string, Form, RequestBody, RobotClient};
use crate::error::ProviderError;

const EXPECTED: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fingerprint: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub key_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
}

#[derive(Deserialize)]
struct KeyEnvelope {
    key: SshKey,
}

impl RobotClient {
    pub async fn get_ssh_key(&self, fingerprint: &str) -> Result<SshKey, ProviderError> {
        let envelope: KeyEnvelope = self
            .call_json(
                Method::GET,
                &format!("/key/{}", fingerprint),
                RequestBody::Empty,
                EXPECTED,
            )
            .await?;
        Ok(envelope.key)
    }

    pub async fn create_ssh_key(&self, name: &str, data: &str) -> Result<SshKey, ProviderError> {
        let form = Form::new().field("name", name).field("data", data);
        let envelope: KeyEnvelope = self
            .call_json(Method::POST, "/key", RequestBody::Form(form), EXPECTED)
            .await?;
        Ok(envelope.key)
    }

    pub async fn rename_ssh_key(&self, fingerprint: &str, name: &str) -> Result<SshKey, ProviderError> {
        let envelope: KeyEnvelope = self
            .call_json(
                Method::PUT,
                &format!("/key/{}", fingerprint),
                RequestBody::Form(Form::new().field("name", name)),
                EXPECTED,
            )
            .await?;
        Ok(envelope.key)
    }

    pub async fn delete_ssh_key(&self, fingerprint: &str) -> Result<(), ProviderError> {
        self.call(
            Method::DELETE,
            &format!("/key/{}", fingerprint),
            RequestBody::Empty,
            EXPECTED,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use std::sync::Arc;

    const KEY: &str = r#"{"key":{"name":"deploy","fingerprint":"56:29:99:a4:5d:ed:ac:95:c1:f5:88:82:90:5d:dd:10","type":"ED25519","size":256,"data":"ssh-ed25519 AAAAC3Nz","created_at":"2021-12-31 23:59:59"}}"#;

    #[tokio::test]
    async fn test_create_posts_form() {
        let mock = Arc::new(MockTransport::new());
        mock.expect(Method::POST, "/key", StatusCode::CREATED, KEY);
        let client = RobotClient::new(mock.clone());

        let key = client.create_ssh_key("deploy", "ssh-ed25519 AAAAC3Nz").await.unwrap();
        assert_eq!(key.fingerprint, "56:29:99:a4:5d:ed:ac:95:c1:f5:88:82:90:5d:dd:10");
        assert_eq!(key.key_type, "ED25519");
        assert_eq!(key.size, 256);

        let requests = mock.requests();
        let form = requests[0].form().unwrap();
        assert_eq!(form.get("name"), Some("deploy"));
        assert_eq!(form.get("data"), Some("ssh-ed25519 AAAAC3Nz"));
    }

    #[tokio::test]
    async fn test_rename_uses_put() {
        let mock = Arc::new(MockTransport::new());
        let path = "/key/56:29:99:a4:5d:ed:ac:95:c1:f5:88:82:90:5d:dd:10";
        mock.expect(Method::PUT, path, StatusCode::OK, KEY);
        mock.expect(Method::DELETE, path, StatusCode::OK, "");
        let client = RobotClient::new(mock.clone());

        let fingerprint = "56:29:99:a4:5d:ed:ac:95:c1:f5:88:82:90:5d:dd:10";
        client.rename_ssh_key(fingerprint, "deploy").await.unwrap();
        client.delete_ssh_key(fingerprint).await.unwrap();
        mock.assert_done();
    }
}
