//! Client for the Hetzner Robot webservice.
//!
//! [`RobotClient`] wraps a [`Transport`] with status-code validation and
//! decoding; the per-area operations live in the submodules.

pub mod boot;
pub mod firewall;
pub mod server;
pub mod ssh_key;
pub mod transport;
pub mod vswitch;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::ProviderConfig;
use crate::error::ProviderError;

pub use boot::{parse_boot_profile, BootActivation, BootMode, BootProfile};
pub use firewall::{Firewall, FirewallRule};
pub use server::{RobotServer, ServerSubnet};
pub use ssh_key::SshKey;
pub use transport::{ApiRequest, ApiResponse, Form, HttpTransport, RequestBody, Transport};
pub use vswitch::{MembershipDelta, VSwitch, VSwitchCloudNetwork, VSwitchServer, VSwitchSubnet};

/// Authenticated Robot webservice client.
#[derive(Clone)]
pub struct RobotClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RobotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotClient").finish_non_exhaustive()
    }
}

impl RobotClient {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client talking HTTPS to the configured endpoint.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Send a request and return the body when the status is one of `expected`.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        expected: &[StatusCode],
    ) -> Result<String, ProviderError> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
        };
        debug!(method = %request.method, path = %request.path, body = ?request.body, "Robot request");

        let response = self.transport.send(&request).await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "Robot response"
        );
        trace!(body = %RedactedBody(&response.body), "Robot response body");

        if expected.contains(&response.status) {
            Ok(response.body)
        } else {
            Err(ProviderError::from_api_response(
                response.status.as_u16(),
                &response.body,
            ))
        }
    }

    /// [`RobotClient::call`] and decode the body as `T`.
    pub(crate) async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        expected: &[StatusCode],
    ) -> Result<T, ProviderError> {
        let body = self.call(method, path, body, expected).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Members whose values never reach the logs.
const SECRET_KEYS: &[&str] = &["password"];

/// Response body for logging, with [`SECRET_KEYS`] masked.
///
/// Boot documents carry the generated root password.
struct RedactedBody<'a>(&'a str);

impl std::fmt::Display for RedactedBody<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::from_str::<Value>(self.0) {
            Ok(mut value) => {
                mask_secrets(&mut value);
                write!(f, "{}", value)
            }
            Err(_) => f.write_str(self.0),
        }
    }
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(members) => {
            for (key, member) in members.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && !member.is_null() {
                    *member = Value::String("<redacted>".to_string());
                } else {
                    mask_secrets(member);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

/// Robot returns `null` for unset strings and sometimes numbers for string fields.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// `null` or a missing list decodes as empty.
pub(crate) fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
