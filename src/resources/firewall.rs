//! `hetznerrobot_firewall`

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{get_bool, get_str, get_str_or_empty, Resource};
use crate::client::firewall::{FirewallRules, STATUS_ACTIVE, STATUS_DISABLED};
use crate::client::{Firewall, FirewallRule, RobotClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};

/// Robot accepts at most ten input rules.
pub const MAX_RULES: u32 = 10;

const ACTIONS: &[&str] = &["accept", "discard"];
const IP_VERSIONS: &[&str] = &["ipv4", "ipv6"];
const OPTIONAL_RULE_FIELDS: &[&str] = &[
    "name", "dst_ip", "dst_port", "src_ip", "src_port", "protocol", "tcp_flags",
];

pub struct FirewallResource;

fn rule_block() -> Block {
    Block::new()
        .with_attribute("name", Attribute::required_string())
        .with_attribute(
            "action",
            Attribute::required_string().with_description("accept or discard"),
        )
        .with_attribute(
            "ip_version",
            Attribute::optional_string().with_default(json!("ipv4")),
        )
        .with_attribute("dst_ip", Attribute::optional_string())
        .with_attribute("dst_port", Attribute::optional_string())
        .with_attribute("src_ip", Attribute::optional_string())
        .with_attribute("src_port", Attribute::optional_string())
        .with_attribute("protocol", Attribute::optional_string())
        .with_attribute("tcp_flags", Attribute::optional_string())
}

fn rules_from_state(state: &Value) -> Vec<FirewallRule> {
    let Some(rules) = state.get("rule").and_then(Value::as_array) else {
        return vec![];
    };
    rules
        .iter()
        .map(|rule| FirewallRule {
            ip_version: get_str_or_empty(rule, "ip_version").to_string(),
            name: get_str_or_empty(rule, "name").to_string(),
            dst_ip: get_str_or_empty(rule, "dst_ip").to_string(),
            dst_port: get_str_or_empty(rule, "dst_port").to_string(),
            src_ip: get_str_or_empty(rule, "src_ip").to_string(),
            src_port: get_str_or_empty(rule, "src_port").to_string(),
            protocol: get_str_or_empty(rule, "protocol").to_string(),
            tcp_flags: get_str_or_empty(rule, "tcp_flags").to_string(),
            action: get_str_or_empty(rule, "action").to_string(),
        })
        .collect()
}

fn rule_state(rule: &FirewallRule) -> Value {
    let mut item = Map::new();
    let ip_version = if rule.ip_version.is_empty() {
        "ipv4"
    } else {
        rule.ip_version.as_str()
    };
    item.insert("ip_version".to_string(), json!(ip_version));
    item.insert("action".to_string(), json!(rule.action));
    for (field, value) in [
        ("name", &rule.name),
        ("dst_ip", &rule.dst_ip),
        ("dst_port", &rule.dst_port),
        ("src_ip", &rule.src_ip),
        ("src_port", &rule.src_port),
        ("protocol", &rule.protocol),
        ("tcp_flags", &rule.tcp_flags),
    ] {
        if !value.is_empty() {
            item.insert(field.to_string(), json!(value));
        }
    }
    Value::Object(item)
}

fn firewall_from_state(state: &Value) -> Result<Firewall, ProviderError> {
    let status = if get_bool(state, "active")? {
        STATUS_ACTIVE
    } else {
        STATUS_DISABLED
    };
    Ok(Firewall {
        server_ip: get_str(state, "server_ip")?.to_string(),
        status: status.to_string(),
        whitelist_hos: get_bool(state, "whitelist_hos")?,
        rules: FirewallRules {
            input: rules_from_state(state),
        },
        ..Default::default()
    })
}

/// State of `firewall`; `prior_active` is kept while Robot is still applying a change.
fn firewall_state(firewall: &Firewall, prior_active: bool) -> Value {
    let active = match firewall.status.as_str() {
        STATUS_ACTIVE => true,
        STATUS_DISABLED => false,
        other => {
            debug!(server_ip = %firewall.server_ip, status = other, "firewall status in transition");
            prior_active
        }
    };
    json!({
        "id": firewall.server_ip,
        "server_ip": firewall.server_ip,
        "active": active,
        "whitelist_hos": firewall.whitelist_hos,
        "rule": firewall.rules.input.iter().map(rule_state).collect::<Vec<_>>(),
    })
}

#[async_trait::async_trait]
impl Resource for FirewallResource {
    fn type_name(&self) -> &'static str {
        "hetznerrobot_firewall"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Stateless firewall of a dedicated server")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "server_ip",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Main IPv4 address of the server"),
            )
            .with_attribute("active", Attribute::required_bool())
            .with_attribute(
                "whitelist_hos",
                Attribute::required_bool().with_description("Allow Hetzner services through the firewall"),
            )
            .with_block("rule", NestedBlock::list(rule_block()).with_max_items(MAX_RULES))
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let Some(rules) = config.get("rule").and_then(Value::as_array) else {
            return diagnostics;
        };

        for (i, rule) in rules.iter().enumerate() {
            if let Some(action) = rule.get("action").and_then(Value::as_str) {
                if !ACTIONS.contains(&action) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid firewall action {:?}", action))
                            .with_detail("action must be one of: accept, discard")
                            .with_attribute(format!("rule.{}.action", i)),
                    );
                }
            }
            if let Some(version) = rule.get("ip_version").and_then(Value::as_str) {
                if !IP_VERSIONS.contains(&version) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid IP version {:?}", version))
                            .with_detail("ip_version must be one of: ipv4, ipv6")
                            .with_attribute(format!("rule.{}.ip_version", i)),
                    );
                }
            }
            for field in OPTIONAL_RULE_FIELDS {
                if rule.get(*field).and_then(Value::as_str) == Some("") {
                    diagnostics.push(
                        Diagnostic::warning(format!("Empty firewall rule field '{}'", field))
                            .with_detail("Empty values are not sent to Robot; omit the attribute instead")
                            .with_attribute(format!("rule.{}.{}", i, field)),
                    );
                }
            }
        }
        diagnostics
    }

    async fn create(&self, client: &RobotClient, planned: Value) -> Result<Value, ProviderError> {
        let desired = firewall_from_state(&planned)?;
        client.set_firewall(&desired).await?;
        info!(server_ip = %desired.server_ip, rules = desired.rules.input.len(), "configured firewall");
        Ok(firewall_state(&desired, desired.is_active()))
    }

    async fn read(&self, client: &RobotClient, current: Value) -> Result<Value, ProviderError> {
        let server_ip = get_str(&current, "id")?;
        let firewall = client
            .get_firewall(server_ip)
            .await
            .map_err(|e| e.or_not_found(format!("firewall of {}", server_ip)))?;
        let prior_active = current.get("active").and_then(Value::as_bool).unwrap_or(false);
        Ok(firewall_state(&firewall, prior_active))
    }

    async fn update(&self, client: &RobotClient, _prior: Value, planned: Value) -> Result<Value, ProviderError> {
        self.create(client, planned).await
    }

    async fn delete(&self, client: &RobotClient, current: Value) -> Result<(), ProviderError> {
        let server_ip = get_str(&current, "id")?;
        client.delete_firewall(server_ip).await?;
        info!(%server_ip, "removed firewall configuration");
        Ok(())
    }

    async fn import(&self, client: &RobotClient, id: &str) -> Result<Value, ProviderError> {
        let firewall = client
            .get_firewall(id)
            .await
            .map_err(|e| e.or_not_found(format!("firewall of {}", id)))?;
        Ok(firewall_state(&firewall, false))
    }
}
