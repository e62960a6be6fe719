//! Provider configuration: Robot webservice credentials and endpoint.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Public Robot webservice endpoint.
pub const DEFAULT_URL: &str = "https://robot-ws.your-server.de";

/// Environment variable consulted when `username` is not configured.
pub const USERNAME_ENV: &str = "HETZNERROBOT_USERNAME";
/// Environment variable consulted when `password` is not configured.
pub const PASSWORD_ENV: &str = "HETZNERROBOT_PASSWORD";
/// Environment variable consulted when `url` is not configured.
pub const URL_ENV: &str = "HETZNERROBOT_URL";

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Robot webservice user.
    pub username: String,
    /// Robot webservice password.
    pub password: String,
    /// Base URL of the webservice, without trailing slash.
    pub url: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    username: Option<String>,
    password: Option<String>,
    url: Option<String>,
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Hetzner Robot webservice access")
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("Robot webservice user, defaults to ${}", USERNAME_ENV)),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("Robot webservice password, defaults to ${}", PASSWORD_ENV)),
            )
            .with_attribute(
                "url",
                Attribute::optional_string().with_description(format!(
                    "Robot webservice URL, defaults to ${} or {}",
                    URL_ENV, DEFAULT_URL
                )),
            )
    }

    /// Resolve the configuration from the host-supplied JSON and the process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration with an explicit environment lookup.
    pub fn resolve(
        config: &Value,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        let raw: RawConfig = if config.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(config.clone())?
        };

        let pick = |configured: Option<String>, var: &str| {
            configured
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let username = pick(raw.username, USERNAME_ENV).ok_or_else(|| {
            ProviderError::Configuration(format!("username is not set and ${} is empty", USERNAME_ENV))
        })?;
        let password = pick(raw.password, PASSWORD_ENV).ok_or_else(|| {
            ProviderError::Configuration(format!("password is not set and ${} is empty", PASSWORD_ENV))
        })?;
        let url = pick(raw.url, URL_ENV).unwrap_or_else(|| DEFAULT_URL.to_string());

        Ok(Self {
            username,
            password,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Diagnostics for a configuration that cannot be resolved.
    pub fn diagnose(config: &Value, env: impl Fn(&str) -> Option<String>) -> Vec<Diagnostic> {
        match Self::resolve(config, env) {
            Ok(_) => vec![],
            Err(ProviderError::Configuration(msg)) => {
                let attribute = if msg.starts_with("username") {
                    "username"
                } else {
                    "password"
                };
                vec![Diagnostic::error("Missing Robot credentials")
                    .with_detail(msg)
                    .with_attribute(attribute)]
            }
            Err(e) => vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_from_config() {
        let config = ProviderConfig::resolve(
            &json!({"username": "#ws+abc", "password": "secret", "url": "http://localhost:8080/"}),
            no_env,
        )
        .unwrap();

        assert_eq!(config.username, "#ws+abc");
        assert_eq!(config.password, "secret");
        assert_eq!(config.url, "http://localhost:8080");
    }

    #[test]
    fn test_resolve_env_fallback_and_default_url() {
        let env = |name: &str| match name {
            USERNAME_ENV => Some("env-user".to_string()),
            PASSWORD_ENV => Some("env-pass".to_string()),
            _ => None,
        };
        let config = ProviderConfig::resolve(&json!({"username": ""}), env).unwrap();

        assert_eq!(config.username, "env-user");
        assert_eq!(config.password, "env-pass");
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn test_missing_password() {
        let err = ProviderConfig::resolve(&json!({"username": "u"}), no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let diagnostics = ProviderConfig::diagnose(&json!({"username": "u"}), no_env);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("password"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig::resolve(&json!({"username": "u", "password": "hunter2"}), no_env).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_credentials_sensitive() {
        let schema = ProviderConfig::schema();
        assert!(schema.attribute("username").unwrap().flags.sensitive);
        assert!(schema.attribute("password").unwrap().flags.sensitive);
        assert!(!schema.attribute("url").unwrap().flags.sensitive);
    }
}
