//! `hetznerrobot_vswitch` data source.

use serde_json::{json, Value};

use super::DataSource;
use crate::client::{RobotClient, VSwitch};
use crate::error::ProviderError;
use crate::resources::vswitch::{attached_server_type, cloud_network_type, subnet_type};
use crate::resources::{get_str, parse_numeric_id};
use crate::schema::{Attribute, Schema};

pub struct VSwitchDataSource;

fn vswitch_data(vswitch: &VSwitch) -> Value {
    json!({
        "id": vswitch.id.to_string(),
        "vswitch_id": vswitch.id.to_string(),
        "name": vswitch.name,
        "vlan": vswitch.vlan,
        "is_cancelled": vswitch.cancelled,
        "servers": vswitch.server,
        "subnets": vswitch.subnet,
        "cloud_networks": vswitch.cloud_network,
    })
}

#[async_trait::async_trait]
impl DataSource for VSwitchDataSource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_vswitch"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Look up a vSwitch by id")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("vswitch_id", Attribute::required_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("vlan", Attribute::computed_int64())
            .with_attribute("is_cancelled", Attribute::computed_bool())
            .with_attribute(
                "servers",
                Attribute::computed_list(attached_server_type()).with_description("Attached server list"),
            )
            .with_attribute("subnets", Attribute::computed_list(subnet_type()))
            .with_attribute("cloud_networks", Attribute::computed_list(cloud_network_type()))
    }

    async fn read(&self, client: &RobotClient, config: Value) -> Result<Value, ProviderError> {
        let id = parse_numeric_id(get_str(&config, "vswitch_id")?)?;
        let vswitch = client
            .get_vswitch(id)
            .await
            .map_err(|e| e.or_not_found(format!("vSwitch {}", id)))?;
        Ok(vswitch_data(&vswitch))
    }
}
