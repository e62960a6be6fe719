//! `hetznerrobot_server` data source.

use serde_json::{json, Value};

use super::DataSource;
use crate::client::{RobotClient, RobotServer};
use crate::error::ProviderError;
use crate::resources::get_u64;
use crate::schema::{Attribute, AttributeType, Schema};

pub struct ServerDataSource;

const FLAGS: &[(&str, &str)] = &[
    ("reset", "Reset available"),
    ("rescue", "Rescue system available"),
    ("vnc", "VNC installation available"),
    ("windows", "Windows installation available"),
    ("plesk", "Plesk installation available"),
    ("cpanel", "cPanel installation available"),
    ("wol", "Wake On LAN available"),
    ("hot_swap", "Hot swap available"),
];

fn server_data(server: &RobotServer) -> Value {
    json!({
        "id": server.server_number.to_string(),
        "server_number": server.server_number,
        "server_name": server.server_name,
        "server_ip": server.server_ip,
        "server_ipv6": server.server_ipv6_net,
        "datacenter": server.dc,
        "is_cancelled": server.cancelled,
        "paid_until": server.paid_until,
        "product": server.product,
        "ip_addresses": server.ip,
        "server_subnets": server.subnet,
        "status": server.status,
        "traffic": server.traffic,
        "linked_storagebox": server.linked_storagebox,
        "reset": server.reset,
        "rescue": server.rescue,
        "vnc": server.vnc,
        "windows": server.windows,
        "plesk": server.plesk,
        "cpanel": server.cpanel,
        "wol": server.wol,
        "hot_swap": server.hot_swap,
    })
}

#[async_trait::async_trait]
impl DataSource for ServerDataSource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_server"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Look up a dedicated server by number")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("server_number", Attribute::required_int64())
            .with_attribute("server_name", Attribute::computed_string())
            .with_attribute("server_ip", Attribute::computed_string())
            .with_attribute("server_ipv6", Attribute::computed_string().with_description("Server IPv6 net"))
            .with_attribute("datacenter", Attribute::computed_string())
            .with_attribute("is_cancelled", Attribute::computed_bool())
            .with_attribute("paid_until", Attribute::computed_string())
            .with_attribute("product", Attribute::computed_string())
            .with_attribute("ip_addresses", Attribute::computed_list(AttributeType::String))
            .with_attribute(
                "server_subnets",
                Attribute::computed_list(AttributeType::object([
                    ("ip", AttributeType::String),
                    ("mask", AttributeType::String),
                ])),
            )
            .with_attribute("status", Attribute::computed_string())
            .with_attribute(
                "traffic",
                Attribute::computed_string().with_description("Free traffic quota, 'unlimited' in case of unlimited traffic"),
            )
            .with_attribute("linked_storagebox", Attribute::computed_int64());

        FLAGS.iter().fold(schema, |schema, (name, description)| {
            schema.with_attribute(*name, Attribute::computed_bool().with_description(*description))
        })
    }

    async fn read(&self, client: &RobotClient, config: Value) -> Result<Value, ProviderError> {
        let number = get_u64(&config, "server_number")?;
        let server = client
            .get_server(number)
            .await
            .map_err(|e| e.or_not_found(format!("server {}", number)))?;
        Ok(server_data(&server))
    }
}
