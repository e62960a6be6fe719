//! Per-server stateless firewall.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::{lenient_string, nullable_vec, Form, RequestBody, RobotClient};
use crate::error::ProviderError;

const EXPECTED: &[StatusCode] = &[StatusCode::OK, StatusCode::ACCEPTED];

/// Firewall status as reported by Robot (`active`, `disabled`, `in process`).
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DISABLED: &str = "disabled";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip_version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dst_ip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dst_port: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub src_ip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub src_port: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protocol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tcp_flags: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRules {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub input: Vec<FirewallRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    #[serde(default, deserialize_with = "lenient_string")]
    pub server_ip: String,
    #[serde(default)]
    pub server_number: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub whitelist_hos: bool,
    #[serde(default)]
    pub rules: FirewallRules,
}

#[derive(Deserialize)]
struct FirewallEnvelope {
    firewall: Firewall,
}

impl Firewall {
    /// Whether the firewall is switched on.
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Form body of `POST /firewall/{ip}`.
    pub fn form(&self) -> Form {
        let status = if self.is_active() {
            STATUS_ACTIVE
        } else {
            STATUS_DISABLED
        };
        let mut form = Form::new()
            .field("whitelist_hos", self.whitelist_hos)
            .field("status", status);

        for (i, rule) in self.rules.input.iter().enumerate() {
            let key = |field: &str| format!("rules[input][{}][{}]", i, field);
            let ip_version = if rule.ip_version.is_empty() {
                "ipv4"
            } else {
                rule.ip_version.as_str()
            };
            form.push(key("ip_version"), ip_version);

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
                    form.push(key(field), value);
                }
            }
            form.push(key("action"), &rule.action);
        }
        form
    }
}

impl RobotClient {
    /// Firewall configuration of the server with main IP `server_ip`.
    pub async fn get_firewall(&self, server_ip: &str) -> Result<Firewall, ProviderError> {
        let envelope: FirewallEnvelope = self
            .call_json(
                Method::GET,
                &format!("/firewall/{}", server_ip),
                RequestBody::Empty,
                EXPECTED,
            )
            .await?;
        Ok(envelope.firewall)
    }

    /// Replace the firewall configuration and rule set.
    pub async fn set_firewall(&self, firewall: &Firewall) -> Result<Firewall, ProviderError> {
        let envelope: FirewallEnvelope = self
            .call_json(
                Method::POST,
                &format!("/firewall/{}", firewall.server_ip),
                RequestBody::Form(firewall.form()),
                EXPECTED,
            )
            .await?;
        Ok(envelope.firewall)
    }

    /// Remove the firewall configuration.
    pub async fn delete_firewall(&self, server_ip: &str) -> Result<(), ProviderError> {
        self.call(
            Method::DELETE,
            &format!("/firewall/{}", server_ip),
            RequestBody::Empty,
            EXPECTED,
        )
        .await?;
        Ok(())
    }
}
