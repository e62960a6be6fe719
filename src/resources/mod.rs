//! Managed resources.
//!
//! Each resource type implements [`Resource`] and is registered in
//! [`registry`]. States are JSON objects shaped by the resource schema with a
//! string `id`.

pub mod boot;
pub mod firewall;
pub mod server;
pub mod ssh_key;
pub mod vswitch;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::client::RobotClient;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

/// Lifecycle of one resource type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `hetznerrobot_vswitch`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Checks beyond what the schema expresses.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        vec![]
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError>;

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError>;

    async fn update(&self, client: &RobotClient, prior: Value, planned: Value) -> Result<Value, ProviderError>;

    async fn delete(&self, client: &RobotClient, current: Value) -> Result<(), ProviderError>;

    /// Build the state of an existing object from its id.
    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        let _ = (client, id);
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            self.type_name()
        )))
    }
}

/// All resources keyed by type name.
pub fn registry() -> BTreeMap<&'static str, Box<dyn Resource>> {
    let resources: Vec<Box<dyn Resource>> = vec![
        Box::new(boot::BootResource),
        Box::new(firewall::FirewallResource),
        Box::new(server::ServerResource),
        Box::new(ssh_key::SshKeyResource),
        Box::new(vswitch::VSwitchResource),
    ];
    resources.into_iter().map(|r| (r.type_name(), r)).collect()
}

// State accessors shared by resources and data sources.

pub(crate) fn get_str<'a>(state: &'a Value, name: &str) -> Result<&'a str, ProviderError> {
    state
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("missing string attribute '{}'", name)))
}

pub(crate) fn get_str_or_empty<'a>(state: &'a Value, name: &str) -> &'a str {
    state.get(name).and_then(Value::as_str).unwrap_or_default()
}

/// Non-negative integer value, accepting whole floats such as `4000.0`.
pub(crate) fn as_whole_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

pub(crate) fn get_u64(state: &Value, name: &str) -> Result<u64, ProviderError> {
    state
        .get(name)
        .and_then(as_whole_u64)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("missing integer attribute '{}'", name)))
}

pub(crate) fn get_bool(state: &Value, name: &str) -> Result<bool, ProviderError> {
    state
        .get(name)
        .and_then(Value::as_bool)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("missing bool attribute '{}'", name)))
}

/// Integers of a list attribute; a missing list is empty, a bad element is an error.
pub(crate) fn get_u64_list(state: &Value, name: &str) -> Result<Vec<u64>, ProviderError> {
    let Some(items) = state.get(name).and_then(Value::as_array) else {
        return Ok(vec![]);
    };
    items
        .iter()
        .map(|item| {
            as_whole_u64(item).ok_or_else(|| {
                ProviderError::InvalidRequest(format!("'{}' contains {}, expected a non-negative integer", name, item))
            })
        })
        .collect()
}

pub(crate) fn get_str_list(state: &Value, name: &str) -> Vec<String> {
    state
        .get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Numeric id stored as the state's string `id`.
pub(crate) fn numeric_id(state: &Value) -> Result<u64, ProviderError> {
    parse_numeric_id(get_str(state, "id")?)
}

pub(crate) fn parse_numeric_id(id: &str) -> Result<u64, ProviderError> {
    id.parse()
        .map_err(|_| ProviderError::InvalidRequest(format!("id {:?} is not a number", id)))
}
