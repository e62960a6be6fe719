//! vSwitches and their server membership.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{lenient_string, nullable_vec, Form, RequestBody, RobotClient};
use crate::error::ProviderError;

const MEMBERSHIP_EXPECTED: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSwitchServer {
    #[serde(deserialize_with = "lenient_string")]
    pub server_ip: String,
    #[serde(deserialize_with = "lenient_string")]
    pub server_ipv6_net: String,
    pub server_number: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSwitchSubnet {
    #[serde(deserialize_with = "lenient_string")]
    pub ip: String,
    pub mask: u32,
    #[serde(deserialize_with = "lenient_string")]
    pub gateway: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSwitchCloudNetwork {
    pub id: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub ip: String,
    pub mask: u32,
    #[serde(deserialize_with = "lenient_string")]
    pub gateway: String,
}

/// A vSwitch as returned by `GET /vswitch/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSwitch {
    pub id: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    pub vlan: u32,
    pub cancelled: bool,
    #[serde(deserialize_with = "nullable_vec")]
    pub server: Vec<VSwitchServer>,
    #[serde(deserialize_with = "nullable_vec")]
    pub subnet: Vec<VSwitchSubnet>,
    #[serde(deserialize_with = "nullable_vec")]
    pub cloud_network: Vec<VSwitchCloudNetwork>,
}

impl VSwitch {
    /// Server numbers currently attached.
    pub fn server_numbers(&self) -> BTreeSet<u64> {
        self.server.iter().map(|s| s.server_number).collect()
    }
}

/// Servers to attach to and detach from a vSwitch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// `desired - previous`, ascending.
    pub add: Vec<u64>,
    /// `previous - desired`, ascending.
    pub remove: Vec<u64>,
}

impl MembershipDelta {
    pub fn between(
        previous: impl IntoIterator<Item = u64>,
        desired: impl IntoIterator<Item = u64>,
    ) -> Self {
        let previous: BTreeSet<u64> = previous.into_iter().collect();
        let desired: BTreeSet<u64> = desired.into_iter().collect();
        Self {
            add: desired.difference(&previous).copied().collect(),
            remove: previous.difference(&desired).copied().collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

fn membership_form(servers: &[u64]) -> Form {
    let mut form = Form::new();
    for server in servers {
        form.push("server[]", server);
    }
    form
}

impl RobotClient {
    pub async fn get_vswitch(&self, id: u64) -> Result<VSwitch, ProviderError> {
        self.call_json(
            Method::GET,
            &format!("/vswitch/{}", id),
            RequestBody::Empty,
            &[StatusCode::OK],
        )
        .await
    }

    pub async fn create_vswitch(&self, name: &str, vlan: u32) -> Result<VSwitch, ProviderError> {
        let form = Form::new().field("name", name).field("vlan", vlan);
        self.call_json(
            Method::POST,
            "/vswitch",
            RequestBody::Form(form),
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await
    }

    pub async fn update_vswitch(&self, id: u64, name: &str, vlan: u32) -> Result<(), ProviderError> {
        let form = Form::new().field("name", name).field("vlan", vlan);
        self.call(
            Method::POST,
            &format!("/vswitch/{}", id),
            RequestBody::Form(form),
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;
        Ok(())
    }

    /// Cancel a vSwitch effective `date`.
    pub async fn cancel_vswitch(&self, id: u64, date: NaiveDate) -> Result<(), ProviderError> {
        let form = Form::new().field("cancellation_date", date.format("%Y-%m-%d"));
        self.call(
            Method::DELETE,
            &format!("/vswitch/{}", id),
            RequestBody::Form(form),
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }

    pub async fn add_vswitch_servers(&self, id: u64, servers: &[u64]) -> Result<(), ProviderError> {
        self.call(
            Method::POST,
            &format!("/vswitch/{}/server", id),
            RequestBody::Form(membership_form(servers)),
            MEMBERSHIP_EXPECTED,
        )
        .await?;
        Ok(())
    }

    pub async fn remove_vswitch_servers(&self, id: u64, servers: &[u64]) -> Result<(), ProviderError> {
        self.call(
            Method::DELETE,
            &format!("/vswitch/{}/server", id),
            RequestBody::Form(membership_form(servers)),
            MEMBERSHIP_EXPECTED,
        )
        .await?;
        Ok(())
    }

    /// Bring the vSwitch membership from `previous` to `desired`.
    ///
    /// At most one add and one remove call are made; equal sets make none.
    pub async fn reconcile_vswitch_servers(
        &self,
        id: u64,
        previous: impl IntoIterator<Item = u64>,
        desired: impl IntoIterator<Item = u64>,
    ) -> Result<MembershipDelta, ProviderError> {
        let delta = MembershipDelta::between(previous, desired);
        debug!(vswitch = id, add = ?delta.add, remove = ?delta.remove, "reconciling vSwitch servers");

        if !delta.add.is_empty() {
            self.add_vswitch_servers(id, &delta.add).await?;
        }
        if !delta.remove.is_empty() {
            self.remove_vswitch_servers(id, &delta.remove).await?;
        }
        Ok(delta)
    }
}
