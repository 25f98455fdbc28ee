//! HTTP client for the sports registry

use super::{endpoints, RegistryApi};
use crate::config::PipelineConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use offerflow_common::types::{Group, LeagueTaxonomy, Participant};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

// ============================================================================
// Registry Client Constants
// ============================================================================

/// Default timeout for registry requests in seconds.
/// Individual participant lookups are additionally bounded by the pipeline's lookup timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Resource name used in errors for the taxonomy endpoint.
const TAXONOMY_RESOURCE: &str = "league-taxonomy";

/// Registry client over HTTP
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create from pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            config.registry_url.clone(),
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str, resource: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| IngestError::lookup_failure(resource, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::lookup_failure(
                resource,
                format!("registry returned {}", status),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| IngestError::lookup_failure(resource, format!("invalid JSON body: {}", err)))?;

        if body.is_null() {
            return Err(IngestError::lookup_failure(resource, "registry returned an empty payload"));
        }

        Ok(body)
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    #[instrument(skip(self))]
    async fn league_taxonomy(&self) -> Result<Group> {
        let url = endpoints::league_taxonomy_url(&self.base_url);
        let body = self.get_json(&url, TAXONOMY_RESOURCE).await?;

        let taxonomy: LeagueTaxonomy = serde_json::from_value(body).map_err(|err| {
            IngestError::lookup_failure(TAXONOMY_RESOURCE, format!("unexpected taxonomy shape: {}", err))
        })?;

        debug!(root = taxonomy.group.id, "Fetched league taxonomy");
        Ok(taxonomy.group)
    }

    #[instrument(skip(self), fields(kind = %participant.kind, participant_id = participant.id))]
    async fn participant(&self, participant: Participant) -> Result<Value> {
        let url = endpoints::participant_url(&self.base_url, participant);
        self.get_json(&url, &participant.to_string()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_client_creation() {
        let client = RegistryClient::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_registry_client_from_config() {
        let config = PipelineConfig {
            registry_url: "http://registry.internal".to_string(),
            ..PipelineConfig::default()
        };
        let client = RegistryClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://registry.internal");
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_lookup_failure() {
        let client = RegistryClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.league_taxonomy().await.unwrap_err();
        assert!(matches!(err, IngestError::RegistryLookupFailure { ref resource, .. } if resource == "league-taxonomy"));
    }
}
