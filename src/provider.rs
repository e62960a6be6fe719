//! The Hetzner Robot provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::client::{RobotClient, Transport};
use crate::config::ProviderConfig;
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_change;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Serves the `hetznerrobot_*` resources and data sources.
pub struct HetznerRobotProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    transport: Option<Arc<dyn Transport>>,
    client: RwLock<Option<RobotClient>>,
}

impl Default for HetznerRobotProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HetznerRobotProvider {
    /// A provider that talks HTTPS to the configured webservice.
    pub fn new() -> Self {
        Self {
            resources: resources::registry(),
            data_sources: data_sources::registry(),
            transport: None,
            client: RwLock::new(None),
        }
    }

    /// A provider that sends every request through `transport` once configured.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            ..Self::new()
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn client(&self) -> Result<RobotClient, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::NotConfigured("configure must succeed before calling the Robot webservice".to_string())
        })
    }

    fn config_diagnostics(config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validate(&ProviderConfig::schema(), config);
        if diagnostics.is_empty() {
            diagnostics = ProviderConfig::diagnose(config, |name| std::env::var(name).ok());
        }
        diagnostics
    }
}

#[async_trait::async_trait]
impl ProviderService for HetznerRobotProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, r)| schema.with_resource(*name, r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, d)| schema.with_data_source(*name, d.schema()))
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(Self::config_diagnostics(&config))
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = Self::config_diagnostics(&config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(&config)?;
        let client = match &self.transport {
            Some(transport) => RobotClient::new(transport.clone()),
            None => RobotClient::from_config(&config)?,
        };
        *self.client.write().await = Some(client);

        info!(url = %config.url, username = %config.username, "configured Robot webservice client");
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        info!("provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validate(&resource.schema(), &config);
        diagnostics.extend(resource.validate(&config));
        Ok(diagnostics)
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        if version > schema.version as i64 {
            return Err(ProviderError::InvalidRequest(format!(
                "state version {} of {} is newer than schema version {}",
                version, resource_type, schema.version
            )));
        }
        Ok(state)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(plan_change(&resource.schema(), prior_state.as_ref(), &proposed_state))
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(&client, planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.read(&client, current_state).await
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.update(&client, prior_state, planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(&client, current_state).await
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.import(&client, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    #[instrument(skip(self, config))]
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let diagnostics = validate(&data_source.schema(), &config);
        if let Some(error) = diagnostics.iter().find(|d| d.is_error()) {
            return Err(ProviderError::Validation(error.summary.clone()));
        }
        let client = self.client().await?;
        data_source.read(&client, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde_json::json;

    fn provider() -> HetznerRobotProvider {
        HetznerRobotProvider::with_transport(Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_schema_lists_everything() {
        let schema = provider().schema();
        assert_eq!(schema.resources.len(), 5);
        assert_eq!(schema.data_sources.len(), 3);
        assert!(schema.provider.attribute("password").unwrap().flags.sensitive);

        let metadata = provider().metadata();
        assert!(metadata.resources.contains(&"hetznerrobot_vswitch".to_string()));
        assert!(metadata.data_sources.contains(&"hetznerrobot_server".to_string()));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = provider();
        let err = provider
            .read("hetznerrobot_vswitch", json!({"id": "1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let provider = provider();
        let err = provider
            .plan("hetznerrobot_rdns", None, json!({}), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .read_data_source("hetznerrobot_rdns", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_and_stop() {
        let provider = provider();
        let diagnostics = provider
            .configure(json!({"username": "robot", "password": "secret"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        assert!(provider.client().await.is_ok());

        provider.stop().await.unwrap();
        assert!(provider.client().await.is_err());
    }

    #[tokio::test]
    async fn test_upgrade_rejects_future_version() {
        let provider = provider();
        let state = json!({"id": "1"});
        assert_eq!(
            provider
                .upgrade_resource_state("hetznerrobot_server", 0, state.clone())
                .await
                .unwrap(),
            state
        );
        assert!(provider
            .upgrade_resource_state("hetznerrobot_server", 3, state)
            .await
            .is_err());
    }
}
