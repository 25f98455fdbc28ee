//! Configuration management
//!
//! All settings come from environment variables (optionally loaded from a
//! `.env` file) with the defaults below.

use crate::error::{IngestError, Result};
use crate::transport::TRANSPORT_BATCH_CEILING;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default queue drained for incoming bet offers.
pub const DEFAULT_SOURCE_QUEUE_URL: &str = "https://epoxy.ai/sourcequeue";

/// Default queue enriched offers are published to.
pub const DEFAULT_DESTINATION_QUEUE_URL: &str = "https://epoxy.ai/destinationqueue";

/// Default base URL of the sports registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://sports.com";

/// Default receive page size. The largest page the transport allows minimizes calls.
pub const DEFAULT_PAGE_SIZE: usize = TRANSPORT_BATCH_CEILING;

/// Default timeout for a single registry lookup in milliseconds.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;

/// Default deadline for a whole invocation in seconds.
pub const DEFAULT_DEADLINE_SECS: u64 = 300;

/// Default number of registry lookups in flight at once.
pub const DEFAULT_ENRICH_CONCURRENCY: usize = 16;

/// How per-item failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any malformed record or failed lookup aborts the invocation
    #[default]
    FailFast,
    /// Failures are recorded per item and the rest of the batch proceeds
    Isolate,
}

impl std::str::FromStr for FailurePolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(FailurePolicy::FailFast),
            "isolate" => Ok(FailurePolicy::Isolate),
            other => Err(IngestError::config(format!(
                "Invalid failure policy '{}', expected 'fail_fast' or 'isolate'",
                other
            ))),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Queue drained for incoming offers
    pub source_queue_url: String,

    /// Queue enriched offers are published to
    pub destination_queue_url: String,

    /// Base URL of the sports registry
    pub registry_url: String,

    /// Messages requested per receive call (1..=10)
    pub page_size: usize,

    /// Timeout for a single registry lookup
    pub lookup_timeout_ms: u64,

    /// Deadline for the whole invocation
    pub deadline_secs: u64,

    /// Registry lookups in flight at once
    pub enrich_concurrency: usize,

    /// Handling of malformed records and failed lookups
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_queue_url: DEFAULT_SOURCE_QUEUE_URL.to_string(),
            destination_queue_url: DEFAULT_DESTINATION_QUEUE_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            deadline_secs: DEFAULT_DEADLINE_SECS,
            enrich_concurrency: DEFAULT_ENRICH_CONCURRENCY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables:
    /// - `OFFERFLOW_SOURCE_QUEUE_URL`, `OFFERFLOW_DESTINATION_QUEUE_URL`
    /// - `OFFERFLOW_REGISTRY_URL`
    /// - `OFFERFLOW_PAGE_SIZE`
    /// - `OFFERFLOW_LOOKUP_TIMEOUT_MS`, `OFFERFLOW_DEADLINE_SECS`
    /// - `OFFERFLOW_ENRICH_CONCURRENCY`
    /// - `OFFERFLOW_FAILURE_POLICY` (`fail_fast` or `isolate`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            source_queue_url: std::env::var("OFFERFLOW_SOURCE_QUEUE_URL")
                .unwrap_or(defaults.source_queue_url),
            destination_queue_url: std::env::var("OFFERFLOW_DESTINATION_QUEUE_URL")
                .unwrap_or(defaults.destination_queue_url),
            registry_url: std::env::var("OFFERFLOW_REGISTRY_URL")
                .unwrap_or(defaults.registry_url),
            page_size: parse_var("OFFERFLOW_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            lookup_timeout_ms: parse_var("OFFERFLOW_LOOKUP_TIMEOUT_MS")?
                .unwrap_or(defaults.lookup_timeout_ms),
            deadline_secs: parse_var("OFFERFLOW_DEADLINE_SECS")?
                .unwrap_or(defaults.deadline_secs),
            enrich_concurrency: parse_var("OFFERFLOW_ENRICH_CONCURRENCY")?
                .unwrap_or(defaults.enrich_concurrency),
            failure_policy: match std::env::var("OFFERFLOW_FAILURE_POLICY") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.failure_policy,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_queue_url.is_empty() {
            return Err(IngestError::config("Source queue URL cannot be empty"));
        }
        if self.destination_queue_url.is_empty() {
            return Err(IngestError::config("Destination queue URL cannot be empty"));
        }
        if self.registry_url.is_empty() {
            return Err(IngestError::config("Registry URL cannot be empty"));
        }
        if self.page_size == 0 || self.page_size > TRANSPORT_BATCH_CEILING {
            return Err(IngestError::config(format!(
                "Page size must be between 1 and {}, got {}",
                TRANSPORT_BATCH_CEILING, self.page_size
            )));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(IngestError::config("Lookup timeout must be greater than 0"));
        }
        if self.deadline_secs == 0 {
            return Err(IngestError::config("Deadline must be greater than 0"));
        }
        if self.enrich_concurrency == 0 {
            return Err(IngestError::config("Enrichment concurrency must be greater than 0"));
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::config(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
