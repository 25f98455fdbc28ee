//! Run report types

use super::publish::PublishResult;
use chrono::{DateTime, Utc};
use offerflow_common::types::Offer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage an isolated failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Drain,
    Enrich,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Drain => "drain",
            Stage::Enrich => "enrich",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// A failure that was recorded instead of aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub stage: Stage,
    /// What failed: a message id, an `offer/outcome` address or an entry id
    pub subject: String,
    pub code: String,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(stage: Stage, subject: impl Into<String>, err: &crate::error::IngestError) -> Self {
        Self {
            stage,
            subject: subject.into(),
            code: err.code().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Counters for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub started_at: DateTime<Utc>,
    pub receive_calls: usize,
    pub drained: usize,
    pub discarded: usize,
    pub enriched_outcomes: usize,
    pub batches: usize,
    pub acknowledged: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

impl PipelineStats {
    pub fn started() -> Self {
        Self {
            started_at: Utc::now(),
            receive_calls: 0,
            drained: 0,
            discarded: 0,
            enriched_outcomes: 0,
            batches: 0,
            acknowledged: 0,
            failed: 0,
            elapsed_ms: 0,
        }
    }
}

/// Result of a completed invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Enriched offers, in drain order
    pub offers: Vec<Offer>,
    /// One result per published entry, in entry order
    pub published: Vec<PublishResult>,
    /// Failures isolated during the run
    pub failures: Vec<ItemFailure>,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.stats.failed == 0
    }
}
