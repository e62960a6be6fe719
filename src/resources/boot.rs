//! `hetznerrobot_boot`
//!
//! Activating a boot profile is one-shot: Robot consumes it on the next
//! reboot, after which `GET /boot` reports nothing active. Reads in that
//! situation keep the last known state instead of planning a re-activation.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{get_str, get_str_list, get_str_or_empty, get_u64, parse_numeric_id, Resource};
use crate::client::{BootActivation, BootMode, BootProfile, RobotClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

pub struct BootResource;

fn activation(planned: &Value) -> Result<BootActivation, ProviderError> {
    Ok(BootActivation {
        mode: get_str(planned, "active_profile")?.parse()?,
        architecture: get_str_or_empty(planned, "architecture").to_string(),
        operating_system: get_str(planned, "operating_system")?.to_string(),
        language: get_str_or_empty(planned, "language").to_string(),
        authorized_keys: get_str_list(planned, "authorized_keys"),
    })
}

/// State after activation: configured values from `planned`, generated ones from `profile`.
fn activated_state(server_id: u64, planned: &Value, profile: &BootProfile) -> Value {
    let mut state = match planned {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    state.insert("id".to_string(), json!(server_id.to_string()));
    state.insert("server_id".to_string(), json!(server_id));
    state.insert("password".to_string(), json!(profile.password));
    state.insert("host_keys".to_string(), json!(profile.host_keys));
    state.insert("server_ipv4".to_string(), json!(profile.server_ipv4));
    state.insert("server_ipv6".to_string(), json!(profile.server_ipv6));
    Value::Object(state)
}

/// State of an active profile as Robot reports it.
fn profile_state(server_id: u64, profile: &BootProfile, mode: BootMode) -> Value {
    let mut state = json!({
        "id": server_id.to_string(),
        "server_id": server_id,
        "active_profile": mode.as_str(),
        "operating_system": profile.operating_system,
        "architecture": profile.architecture,
        "authorized_keys": profile.authorized_keys,
        "password": profile.password,
        "host_keys": profile.host_keys,
        "server_ipv4": profile.server_ipv4,
        "server_ipv6": profile.server_ipv6,
    });
    if !profile.language.is_empty() {
        state["language"] = json!(profile.language);
    }
    state
}

async fn deactivate_ignoring_missing(
    client: &RobotClient,
    server_id: u64,
    mode: BootMode,
) -> Result<(), ProviderError> {
    match client.deactivate_boot(server_id, mode).await {
        Err(err) if err.is_not_found() => {
            warn!(server_id, %mode, "boot profile already inactive");
            Ok(())
        }
        other => other,
    }
}

#[async_trait::async_trait]
impl Resource for BootResource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_boot"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Admin boot profile (installer or rescue system) of a dedicated server")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("server_id", Attribute::required_int64().with_force_new())
            .with_attribute(
                "active_profile",
                Attribute::required_string().with_description("linux or rescue"),
            )
            .with_attribute("operating_system", Attribute::required_string())
            .with_attribute(
                "architecture",
                Attribute::optional_computed_string().with_default(json!("64")),
            )
            .with_attribute(
                "language",
                Attribute::optional_string().with_description("Installer language, linux only"),
            )
            .with_attribute(
                "authorized_keys",
                Attribute::optional_list(AttributeType::String)
                    .with_description("Fingerprints of the SSH keys allowed to log in"),
            )
            .with_attribute("password", Attribute::computed_string().sensitive())
            .with_attribute("host_keys", Attribute::computed_list(AttributeType::String))
            .with_attribute("server_ipv4", Attribute::computed_string())
            .with_attribute("server_ipv6", Attribute::computed_string())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let Some(profile) = config.get("active_profile").and_then(Value::as_str) else {
            return diagnostics;
        };
        match profile.parse::<BootMode>() {
            Ok(BootMode::Rescue) if config.get("language").is_some_and(|l| !l.is_null()) => {
                diagnostics.push(
                    Diagnostic::error("language is only supported by the linux profile")
                        .with_attribute("language"),
                );
            }
            Ok(_) => {}
            Err(err) => diagnostics.push(
                Diagnostic::error("Invalid boot profile")
                    .with_detail(err.message())
                    .with_attribute("active_profile"),
            ),
        }
        diagnostics
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError> {
        let server_id = get_u64(&planned, "server_id")?;
        let activation = activation(&planned)?;
        let profile = client.activate_boot(server_id, &activation).await?;
        info!(server_id, mode = %activation.mode, "activated boot profile");
        Ok(activated_state(server_id, &planned, &profile))
    }

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError> {
        let server_id = get_u64(&current, "server_id")?;
        let profile = client
            .get_boot(server_id)
            .await
            .map_err(|e| e.or_not_found(format!("boot configuration of server {}", server_id)))?;

        match profile.mode {
            Some(mode) => Ok(profile_state(server_id, &profile, mode)),
            None => {
                info!(server_id, "no active boot profile, keeping last known state");
                Ok(current)
            }
        }
    }

    async fn update(&self, client: &RobotClient, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let server_id = get_u64(&prior, "server_id")?;
        let previous: BootMode = get_str(&prior, "active_profile")?.parse()?;
        let activation = activation(&planned)?;

        // An active profile only takes new settings after it has been switched off.
        deactivate_ignoring_missing(client, server_id, previous).await?;
        let profile = client.activate_boot(server_id, &activation).await?;
        info!(server_id, from = %previous, to = %activation.mode, "re-activated boot profile");
        Ok(activated_state(server_id, &planned, &profile))
    }

    async fn delete(&self, client: &RobotClient, current: Value) -> Result<(), ProviderError> {
        let server_id = get_u64(&current, "server_id")?;
        let mode: BootMode = get_str(&current, "active_profile")?.parse()?;
        deactivate_ignoring_missing(client, server_id, mode).await?;
        info!(server_id, %mode, "deactivated boot profile");
        Ok(())
    }

    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        let server_id = parse_numeric_id(id)?;
        let profile = client
            .get_boot(server_id)
            .await
            .map_err(|e| e.or_not_found(format!("boot configuration of server {}", server_id)))?;
        match profile.mode {
            Some(mode) => Ok(profile_state(server_id, &profile, mode)),
            None => Err(ProviderError::NotFound(format!(
                "no active boot profile on server {}",
                server_id
            ))),
        }
    }
}
