//! Error types for the ingest pipeline

use offerflow_common::CommonError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors surfaced by the pipeline stages and their collaborators.
///
/// None of these are retried inside the pipeline; the caller owns any retry policy.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A receive or send asked for more entries than the transport allows
    #[error("Transport limit exceeded: requested {requested} entries, ceiling is {ceiling}")]
    TransportLimitExceeded { requested: usize, ceiling: usize },

    /// A batch send with zero entries
    #[error("Empty batch rejected by transport")]
    EmptyBatchRejected,

    /// A drained message body did not parse into an offer
    #[error("Malformed record {message_id}: {reason}")]
    MalformedRecord { message_id: String, reason: String },

    /// A registry fetch failed (network, not found, bad response)
    #[error("Registry lookup failed for {resource}: {reason}")]
    RegistryLookupFailure { resource: String, reason: String },

    /// A registry fetch did not complete within the per-lookup timeout
    #[error("Registry lookup for {resource} timed out after {timeout_ms}ms")]
    LookupTimeout { resource: String, timeout_ms: u64 },

    /// The configured queue does not exist or cannot be reached
    #[error("Queue unavailable: {queue}: {reason}")]
    QueueUnavailable { queue: String, reason: String },

    /// The league taxonomy revisits a group on its own path
    #[error("League taxonomy contains a cycle at group {group_id}")]
    TaxonomyCycle { group_id: u64 },

    /// The whole invocation ran past its deadline
    #[error("Pipeline exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Some published entries were not acknowledged
    #[error("Publishing failed for {failed} of {total} entries")]
    PublishFailed { failed: usize, total: usize },

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl IngestError {
    pub fn malformed(message_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            message_id: message_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn lookup_failure(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::RegistryLookupFailure {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn queue_unavailable(queue: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::QueueUnavailable {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-readable code, used for per-entry publish failures
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransportLimitExceeded { .. } => "transport_limit_exceeded",
            Self::EmptyBatchRejected => "empty_batch",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::RegistryLookupFailure { .. } => "registry_lookup_failure",
            Self::LookupTimeout { .. } => "lookup_timeout",
            Self::QueueUnavailable { .. } => "queue_unavailable",
            Self::TaxonomyCycle { .. } => "taxonomy_cycle",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::PublishFailed { .. } => "publish_failed",
            Self::Transport(_) => "transport_error",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Http(_) => "http_error",
            Self::Common(CommonError::FingerprintMismatch { .. }) => "fingerprint_mismatch",
            Self::Common(_) => "common_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IngestError::TransportLimitExceeded {
            requested: 11,
            ceiling: 10,
        };
        assert_eq!(
            err.to_string(),
            "Transport limit exceeded: requested 11 entries, ceiling is 10"
        );

        let err = IngestError::lookup_failure("team/42", "404 Not Found");
        assert_eq!(err.to_string(), "Registry lookup failed for team/42: 404 Not Found");
        assert_eq!(err.code(), "registry_lookup_failure");
    }

    #[test]
    fn test_fingerprint_mismatch_code() {
        let err = IngestError::from(CommonError::FingerprintMismatch {
            expected: "00".to_string(),
            actual: "ff".to_string(),
        });
        assert_eq!(err.code(), "fingerprint_mismatch");
        assert_eq!(err.to_string(), "Fingerprint mismatch: expected 00, got ff");
    }

    #[test]
    fn test_queue_unavailable_code() {
        let err = IngestError::queue_unavailable("https://queue.example/missing", "does not exist");
        assert_eq!(err.code(), "queue_unavailable");
        assert!(err.to_string().contains("https://queue.example/missing"));
    }
}
