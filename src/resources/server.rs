//! `hetznerrobot_server`
//!
//! Dedicated servers are ordered outside of the webservice; this resource
//! adopts an existing server, manages its name and forgets it on delete.

use serde_json::{json, Value};
use tracing::info;

use super::{get_str_or_empty, get_u64, parse_numeric_id, Resource};
use crate::client::{RobotClient, RobotServer};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

pub struct ServerResource;

fn server_state(server: &RobotServer) -> Value {
    json!({
        "id": server.server_number.to_string(),
        "server_number": server.server_number,
        "server_name": server.server_name,
        "server_ip": server.server_ip,
        "server_ipv6_net": server.server_ipv6_net,
        "product": server.product,
        "datacenter": server.dc,
        "traffic": server.traffic,
        "status": server.status,
        "is_cancelled": server.cancelled,
        "paid_until": server.paid_until,
    })
}

/// Rename the server when `planned` asks for a different name.
async fn apply_name(
    client: &RobotClient,
    server: RobotServer,
    planned: &Value,
) -> Result<RobotServer, ProviderError> {
    let name = get_str_or_empty(planned, "server_name");
    if name.is_empty() || name == server.server_name {
        return Ok(server);
    }
    let renamed = client.rename_server(server.server_number, name).await?;
    info!(server_number = server.server_number, %name, "renamed server");
    Ok(renamed)
}

#[async_trait::async_trait]
impl Resource for ServerResource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_server"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An existing dedicated server brought under management")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("server_number", Attribute::required_int64().with_force_new())
            .with_attribute("server_name", Attribute::optional_computed_string())
            .with_attribute("server_ip", Attribute::computed_string())
            .with_attribute("server_ipv6_net", Attribute::computed_string())
            .with_attribute("product", Attribute::computed_string())
            .with_attribute("datacenter", Attribute::computed_string())
            .with_attribute("traffic", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("is_cancelled", Attribute::computed_bool())
            .with_attribute("paid_until", Attribute::computed_string())
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError> {
        let number = get_u64(&planned, "server_number")?;
        let server = client
            .get_server(number)
            .await
            .map_err(|e| e.or_not_found(format!("server {}", number)))?;
        let server = apply_name(client, server, &planned).await?;
        info!(server_number = number, "adopted server");
        Ok(server_state(&server))
    }

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError> {
        let number = get_u64(&current, "server_number")?;
        let server = client
            .get_server(number)
            .await
            .map_err(|e| e.or_not_found(format!("server {}", number)))?;
        Ok(server_state(&server))
    }

    async fn update(&self, client: &RobotClient, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let number = get_u64(&prior, "server_number")?;
        let server = client.get_server(number).await?;
        let server = apply_name(client, server, &planned).await?;
        Ok(server_state(&server))
    }

    async fn delete(&self, _client: &RobotClient, current: Value) -> Result<(), ProviderError> {
        let number = get_u64(&current, "server_number")?;
        info!(server_number = number, "released server from management");
        Ok(())
    }

    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        let number = parse_numeric_id(id)?;
        let server = client
            .get_server(number)
            .await
            .map_err(|e| e.or_not_found(format!("server {}", number)))?;
        Ok(server_state(&server))
    }
}
