//! `hetznerrobot_ssh_key`

use regex::Regex;
use serde_json::{json, Value};
use tracing::info;

use super::{get_str, Resource};
use crate::client::{RobotClient, SshKey};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

const FINGERPRINT_PATTERN: &str = "^[0-9a-f]{2}(:[0-9a-f]{2}){15}$";

pub struct SshKeyResource;

/// Whether `fingerprint` looks like an MD5 key fingerprint (`aa:bb:...`, 16 octets).
pub fn is_valid_fingerprint(fingerprint: &str) -> Result<bool, ProviderError> {
    let pattern = Regex::new(FINGERPRINT_PATTERN)
        .map_err(|e| ProviderError::Validation(e.to_string()))?;
    Ok(pattern.is_match(fingerprint))
}

pub(crate) fn key_state(key: &SshKey) -> Value {
    json!({
        "id": key.fingerprint,
        "name": key.name,
        "data": key.data,
        "fingerprint": key.fingerprint,
        "type": key.key_type,
        "size": key.size,
        "created_at": key.created_at,
    })
}

#[async_trait::async_trait]
impl Resource for SshKeyResource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_ssh_key"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An SSH public key stored in the Robot account")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "data",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Public key in OpenSSH format"),
            )
            .with_attribute("fingerprint", Attribute::computed_string())
            .with_attribute("type", Attribute::computed_string())
            .with_attribute("size", Attribute::computed_int64())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError> {
        let name = get_str(&planned, "name")?;
        let data = get_str(&planned, "data")?;
        let mut key = client.create_ssh_key(name, data).await?;
        if key.data.is_empty() {
            key.data = data.to_string();
        }
        info!(fingerprint = %key.fingerprint, "created SSH key");
        Ok(key_state(&key))
    }

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError> {
        let fingerprint = get_str(&current, "id")?;
        let mut key = client
            .get_ssh_key(fingerprint)
            .await
            .map_err(|e| e.or_not_found(format!("SSH key {}", fingerprint)))?;
        if key.data.is_empty() {
            key.data = get_str(&current, "data").unwrap_or_default().to_string();
        }
        Ok(key_state(&key))
    }

    async fn update(&self, client: &RobotClient, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let fingerprint = get_str(&prior, "id")?;
        let name = get_str(&planned, "name")?;

        let mut key = if get_str(&prior, "name")? != name {
            client.rename_ssh_key(fingerprint, name).await?
        } else {
            client.get_ssh_key(fingerprint).await?
        };
        if key.data.is_empty() {
            key.data = get_str(&planned, "data")?.to_string();
        }
        Ok(key_state(&key))
    }

    async fn delete(&self, client: &RobotClient, current: Value) -> Result<(), ProviderError> {
        let fingerprint = get_str(&current, "id")?;
        client.delete_ssh_key(fingerprint).await?;
        info!(%fingerprint, "deleted SSH key");
        Ok(())
    }

    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        if !is_valid_fingerprint(id)? {
            return Err(ProviderError::Validation(format!(
                "{:?} is not an SSH key fingerprint (expected 16 colon-separated hex octets)",
                id
            )));
        }
        let key = client
            .get_ssh_key(id)
            .await
            .map_err(|e| e.or_not_found(format!("SSH key {}", id)))?;
        Ok(key_state(&key))
    }
}
