//! `hetznerrobot_vswitch`

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::Local;
use serde_json::{json, Value};
use tracing::info;

use super::{as_whole_u64, get_str, get_u64, get_u64_list, numeric_id, parse_numeric_id, Resource};
use crate::client::{RobotClient, VSwitch};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// VLAN ids Robot accepts for vSwitches.
pub const VLAN_RANGE: RangeInclusive<u64> = 4000..=4091;

pub struct VSwitchResource;

pub(crate) fn attached_server_type() -> AttributeType {
    AttributeType::object([
        ("server_number", AttributeType::Int64),
        ("server_ip", AttributeType::String),
        ("server_ipv6_net", AttributeType::String),
        ("status", AttributeType::String),
    ])
}

pub(crate) fn subnet_type() -> AttributeType {
    AttributeType::object([
        ("ip", AttributeType::String),
        ("mask", AttributeType::Int64),
        ("gateway", AttributeType::String),
    ])
}

pub(crate) fn cloud_network_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::Int64),
        ("ip", AttributeType::String),
        ("mask", AttributeType::Int64),
        ("gateway", AttributeType::String),
    ])
}

/// State of a vSwitch, with `servers` set to the actual membership.
pub(crate) fn vswitch_state(vswitch: &VSwitch) -> Value {
    json!({
        "id": vswitch.id.to_string(),
        "name": vswitch.name,
        "vlan": vswitch.vlan,
        "servers": vswitch.server_numbers(),
        "is_cancelled": vswitch.cancelled,
        "attached_servers": vswitch.server,
        "subnets": vswitch.subnet,
        "cloud_networks": vswitch.cloud_network,
    })
}

fn planned_vlan(state: &Value) -> Result<u32, ProviderError> {
    let vlan = get_u64(state, "vlan")?;
    if !VLAN_RANGE.contains(&vlan) {
        return Err(ProviderError::Validation(format!(
            "vlan {} is outside {}..={}",
            vlan,
            VLAN_RANGE.start(),
            VLAN_RANGE.end()
        )));
    }
    u32::try_from(vlan).map_err(|_| ProviderError::Validation(format!("vlan {} is too large", vlan)))
}

/// Membership requested by `planned`, or `None` when it leaves `servers` unset.
fn desired_servers(planned: &Value) -> Result<Option<BTreeSet<u64>>, ProviderError> {
    if planned.get("servers").map_or(true, Value::is_null) {
        return Ok(None);
    }
    Ok(Some(get_u64_list(planned, "servers")?.into_iter().collect()))
}

fn with_desired_servers(mut state: Value, desired: Option<&BTreeSet<u64>>) -> Value {
    if let Some(servers) = desired {
        state["servers"] = json!(servers);
    }
    state
}

#[async_trait::async_trait]
impl Resource for VSwitchResource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_vswitch"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A vSwitch connecting dedicated servers over a VLAN")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "vlan",
                Attribute::required_int64().with_description("VLAN id between 4000 and 4091"),
            )
            .with_attribute(
                "servers",
                Attribute::optional_computed_set(AttributeType::Int64)
                    .with_description("Numbers of the servers attached to the vSwitch"),
            )
            .with_attribute("is_cancelled", Attribute::computed_bool())
            .with_attribute("attached_servers", Attribute::computed_list(attached_server_type()))
            .with_attribute("subnets", Attribute::computed_list(subnet_type()))
            .with_attribute("cloud_networks", Attribute::computed_list(cloud_network_type()))
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(vlan) = config.get("vlan").filter(|v| v.is_number()) {
            if !as_whole_u64(vlan).is_some_and(|v| VLAN_RANGE.contains(&v)) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid VLAN id {}", vlan))
                        .with_detail("vlan must be between 4000 and 4091")
                        .with_attribute("vlan"),
                );
            }
        }
        if let Some(servers) = config.get("servers").and_then(Value::as_array) {
            for (i, server) in servers.iter().enumerate() {
                if !as_whole_u64(server).is_some_and(|n| n > 0) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid server number {}", server))
                            .with_detail("servers must contain positive server numbers")
                            .with_attribute(format!("servers.{}", i)),
                    );
                }
            }
        }
        if config.get("name").and_then(Value::as_str) == Some("") {
            diagnostics.push(Diagnostic::error("vSwitch name must not be empty").with_attribute("name"));
        }
        diagnostics
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError> {
        let name = get_str(&planned, "name")?;
        let vlan = planned_vlan(&planned)?;
        let desired = desired_servers(&planned)?;

        let created = client.create_vswitch(name, vlan).await?;
        info!(vswitch = created.id, %name, "created vSwitch");

        client
            .reconcile_vswitch_servers(created.id, [], desired.iter().flatten().copied())
            .await?;

        let vswitch = client.get_vswitch(created.id).await?;
        Ok(with_desired_servers(vswitch_state(&vswitch), desired.as_ref()))
    }

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError> {
        let id = numeric_id(&current)?;
        let vswitch = client
            .get_vswitch(id)
            .await
            .map_err(|e| e.or_not_found(format!("vSwitch {}", id)))?;
        Ok(vswitch_state(&vswitch))
    }

    async fn update(&self, client: &RobotClient, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let id = numeric_id(&prior)?;
        let name = get_str(&planned, "name")?;
        let vlan = planned_vlan(&planned)?;
        let previous = get_u64_list(&prior, "servers")?;
        let desired = desired_servers(&planned)?;

        if get_str(&prior, "name")? != name || get_u64(&prior, "vlan")? != u64::from(vlan) {
            client.update_vswitch(id, name, vlan).await?;
            info!(vswitch = id, %name, vlan, "updated vSwitch");
        }

        // Unset membership keeps whatever is attached.
        if let Some(desired) = &desired {
            client
                .reconcile_vswitch_servers(id, previous, desired.iter().copied())
                .await?;
        }

        let vswitch = client.get_vswitch(id).await?;
        Ok(with_desired_servers(vswitch_state(&vswitch), desired.as_ref()))
    }

    async fn delete(&self, client: &RobotClient, current: Value) -> Result<(), ProviderError> {
        let id = numeric_id(&current)?;
        let today = Local::now().date_naive();
        client.cancel_vswitch(id, today).await?;
        info!(vswitch = id, %today, "cancelled vSwitch");
        Ok(())
    }

    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        let id = parse_numeric_id(id)?;
        let vswitch = client
            .get_vswitch(id)
            .await
            .map_err(|e| e.or_not_found(format!("vSwitch {}", id)))?;
        Ok(vswitch_state(&vswitch))
    }
}
