//! Boot configuration: the linux installer and rescue system profiles.

use std::fmt;
use std::str::FromStr;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use super::{Form, RequestBody, RobotClient};
use crate::error::ProviderError;

const BOOT_ALREADY_ENABLED: &str = "BOOT_ALREADY_ENABLED";

/// Which admin boot profile is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootMode {
    /// Automatic Linux installation.
    Linux,
    /// Rescue system.
    Rescue,
}

impl BootMode {
    /// The Robot path segment and state value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootMode::Linux => "linux",
            BootMode::Rescue => "rescue",
        }
    }
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(BootMode::Linux),
            "rescue" => Ok(BootMode::Rescue),
            other => Err(ProviderError::Validation(format!(
                "boot profile must be \"linux\" or \"rescue\", got {:?}",
                other
            ))),
        }
    }
}

/// Normalized admin boot configuration of one server.
///
/// An inactive profile has `mode == None` and empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootProfile {
    pub mode: Option<BootMode>,
    pub architecture: String,
    pub operating_system: String,
    pub language: String,
    pub password: String,
    pub authorized_keys: Vec<String>,
    pub host_keys: Vec<String>,
    pub server_number: u64,
    pub server_ipv4: String,
    pub server_ipv6: String,
}

impl BootProfile {
    /// Whether an admin boot profile is active.
    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }
}

/// Extract the active boot profile from a `GET /boot/{n}` document or an
/// activation response.
pub fn parse_boot_profile(document: &Value) -> BootProfile {
    let root = document.get("boot").unwrap_or(document);
    let linux = active_section(root, BootMode::Linux);
    let rescue = active_section(root, BootMode::Rescue);

    let (mode, section) = match (linux, rescue) {
        (Some(_), Some(rescue)) => {
            warn!("both linux and rescue boot profiles are active, using rescue");
            (BootMode::Rescue, rescue)
        }
        (None, Some(rescue)) => (BootMode::Rescue, rescue),
        (Some(linux), None) => (BootMode::Linux, linux),
        (None, None) => return BootProfile::default(),
    };

    let (operating_system, language) = match mode {
        BootMode::Linux => (scalar(section, "dist"), scalar(section, "lang")),
        BootMode::Rescue => (scalar(section, "os"), String::new()),
    };

    BootProfile {
        mode: Some(mode),
        architecture: scalar(section, "arch"),
        operating_system,
        language,
        password: scalar(section, "password"),
        authorized_keys: fingerprints(section, "authorized_key"),
        host_keys: fingerprints(section, "host_key"),
        server_number: section
            .get("server_number")
            .and_then(Value::as_u64)
            .unwrap_or_default(),
        server_ipv4: scalar(section, "server_ip"),
        server_ipv6: scalar(section, "server_ipv6_net"),
    }
}

fn active_section(root: &Value, mode: BootMode) -> Option<&Value> {
    root.get(mode.as_str())
        .filter(|section| section.get("active").and_then(Value::as_bool).unwrap_or(false))
}

fn scalar(section: &Value, key: &str) -> String {
    match section.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// Keys come back as `[{"key": {"fingerprint": ...}}]`.
fn fingerprints(section: &Value, key: &str) -> Vec<String> {
    section
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("key")
                        .and_then(|k| k.get("fingerprint"))
                        .or_else(|| item.get("fingerprint"))
                        .or(Some(item))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parameters of a boot profile activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootActivation {
    pub mode: BootMode,
    pub architecture: String,
    pub operating_system: String,
    pub language: String,
    pub authorized_keys: Vec<String>,
}

impl BootActivation {
    /// Form body of `POST /boot/{n}/{mode}`.
    pub fn form(&self) -> Form {
        let mut form = Form::new().field_if_present("arch", &self.architecture);
        for key in &self.authorized_keys {
            form.push("authorized_key", key);
        }
        match self.mode {
            BootMode::Linux => form
                .field_if_present("dist", &self.operating_system)
                .field_if_present("lang", &self.language),
            BootMode::Rescue => form.field_if_present("os", &self.operating_system),
        }
    }
}

impl RobotClient {
    /// Current boot configuration of a server.
    pub async fn get_boot(&self, server_number: u64) -> Result<BootProfile, ProviderError> {
        let document: Value = self
            .call_json(
                Method::GET,
                &format!("/boot/{}", server_number),
                RequestBody::Empty,
                &[StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await?;
        Ok(parse_boot_profile(&document))
    }

    /// Activate a boot profile.
    ///
    /// When Robot reports the profile as already enabled the existing
    /// configuration is returned instead.
    pub async fn activate_boot(
        &self,
        server_number: u64,
        activation: &BootActivation,
    ) -> Result<BootProfile, ProviderError> {
        let result = self
            .call_json::<Value>(
                Method::POST,
                &format!("/boot/{}/{}", server_number, activation.mode),
                RequestBody::Form(activation.form()),
                &[StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await;

        match result {
            Ok(document) => Ok(parse_boot_profile(&document)),
            Err(err) if err.api_code() == Some(BOOT_ALREADY_ENABLED) => {
                info!(server_number, mode = %activation.mode, "boot profile already enabled");
                self.get_boot(server_number).await
            }
            Err(err) => Err(err),
        }
    }

    /// Deactivate a boot profile.
    pub async fn deactivate_boot(&self, server_number: u64, mode: BootMode) -> Result<(), ProviderError> {
        self.call(
            Method::DELETE,
            &format!("/boot/{}/{}", server_number, mode),
            RequestBody::Empty,
            &[StatusCode::OK, StatusCode::ACCEPTED],
        )
        .await?;
        Ok(())
    }
}
