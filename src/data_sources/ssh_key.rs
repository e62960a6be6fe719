//! `hetznerrobot_ssh_key` data source.

use serde_json::Value;

use super::DataSource;
use crate::client::RobotClient;
use crate::error::ProviderError;
use crate::resources::get_str;
use crate::resources::ssh_key::key_state;
use crate::schema::{Attribute, Schema};

pub struct SshKeyDataSource;

#[async_trait::async_trait]
impl DataSource for SshKeyDataSource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_ssh_key"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up an SSH key by fingerprint")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("fingerprint", Attribute::required_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("data", Attribute::computed_string())
            .with_attribute("type", Attribute::computed_string())
            .with_attribute("size", Attribute::computed_int64())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn read(&self, client: &RobotClient, config: Value) -> Result<Value, ProviderError> {
        let fingerprint = get_str(&config, "fingerprint")?;
        let key = client
            .get_ssh_key(fingerprint)
            .await
            .map_err(|e| e.or_not_found(format!("SSH key {}", fingerprint)))?;
        Ok(key_state(&key))
    }
}
