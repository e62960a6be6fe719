//! Read-only data sources.

pub mod server;
pub mod ssh_key;
pub mod vswitch;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::client::RobotClient;
use crate::error::ProviderError;
use crate::schema::Schema;

/// A data source looks an object up by the identifying attribute in its config.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &RobotClient, config: Value) -> Result<Value, ProviderError>;
}

/// All data sources keyed by type name.
pub fn registry() -> BTreeMap<&'static str, Box<dyn DataSource>> {
    let data_sources: Vec<Box<dyn DataSource>> = vec![
        Box::new(server::ServerDataSource),
        Box::new(ssh_key::SshKeyDataSource),
        Box::new(vswitch::VSwitchDataSource),
    ];
    data_sources.into_iter().map(|d| (d.type_name(), d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let names: Vec<_> = registry().keys().copied().collect();
        assert_eq!(
            names,
            vec!["hetznerrobot_server", "hetznerrobot_ssh_key", "hetznerrobot_vswitch"]
        );
    }

    #[test]
    fn test_every_schema_has_id() {
        for (name, data_source) in registry() {
            assert!(data_source.schema().attribute("id").is_some(), "{name} has no id");
        }
    }
}
