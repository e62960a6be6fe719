//! Hetzner Robot provider
//!
//! Manages dedicated-server infrastructure through the
//! [Hetzner Robot webservice](https://robot.hetzner.com/doc/webservice/en.html):
//! SSH keys, firewalls, vSwitches, boot profiles and servers.
//!
//! # Overview
//!
//! - **ProviderService trait**: the lifecycle a host drives (validate, plan, create,
//!   read, update, delete, import, data source reads)
//! - **HetznerRobotProvider**: the implementation, dispatching to [`resources`] and
//!   [`data_sources`] by type name
//! - **RobotClient**: authenticated webservice calls over a pluggable [`client::Transport`]
//! - **Schema and validation**: typed descriptions of every configuration block
//! - **Logging**: `tracing` output to stderr, filtered by `RUST_LOG`
//!
//! # Resources
//!
//! | type | id |
//! |---|---|
//! | `hetznerrobot_ssh_key` | key fingerprint |
//! | `hetznerrobot_firewall` | server main IP |
//! | `hetznerrobot_vswitch` | vSwitch id |
//! | `hetznerrobot_boot` | server number |
//! | `hetznerrobot_server` | server number |
//!
//! Data sources: `hetznerrobot_server`, `hetznerrobot_ssh_key`, `hetznerrobot_vswitch`.
//!
//! # Quick Start
//!
//! ```no_run
//! use hetzner_robot_provider::{HetznerRobotProvider, ProviderService};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), hetzner_robot_provider::ProviderError> {
//! hetzner_robot_provider::init_logging();
//!
//! let provider = HetznerRobotProvider::new();
//! provider
//!     .configure(json!({"username": "#ws+XXXXXXX", "password": "secret"}))
//!     .await?;
//!
//! let config = json!({"name": "backend", "vlan": 4000, "servers": [321]});
//! let plan = provider.plan("hetznerrobot_vswitch", None, config.clone(), config).await?;
//! let state = provider.create("hetznerrobot_vswitch", plan.planned_state).await?;
//! println!("created vSwitch {}", state["id"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! `username`, `password` and `url` fall back to `HETZNERROBOT_USERNAME`,
//! `HETZNERROBOT_PASSWORD` and `HETZNERROBOT_URL`; the URL defaults to
//! `https://robot-ws.your-server.de`.

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::RobotClient;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::HetznerRobotProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
