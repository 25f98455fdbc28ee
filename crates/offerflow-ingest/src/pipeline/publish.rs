//! Batch publishing
//!
//! Offers are serialized into entries whose ids are their positions in the
//! published sequence, partitioned into chunks no larger than the transport
//! ceiling, and sent as independent batch calls. A failed chunk never stops
//! the others; its entries are reported as failures.

use super::report::{ItemFailure, Stage};
use crate::error::{IngestError, Result};
use crate::transport::{check_batch_size, BatchAck, BatchEntry, QueueTransport, TRANSPORT_BATCH_CEILING};
use futures::future::join_all;
use offerflow_common::checksum::verify_fingerprint;
use offerflow_common::types::Offer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Split `items` into consecutive chunks of at most `ceiling` items.
///
/// Yields exactly `ceil(len / ceiling)` chunks; every chunk but the last is full.
/// A `ceiling` of zero is treated as one.
pub fn partition<T>(items: &[T], ceiling: usize) -> Vec<&[T]> {
    items.chunks(ceiling.max(1)).collect()
}

/// Number of chunks [`partition`] produces for `len` items
pub fn chunk_count(len: usize, ceiling: usize) -> usize {
    len.div_ceil(ceiling.max(1))
}

/// Outcome for a single published entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishResult {
    Acknowledged {
        entry_id: String,
        message_id: String,
        fingerprint: String,
    },
    Failed {
        entry_id: String,
        code: String,
        reason: String,
    },
}

impl PublishResult {
    fn failed(entry_id: &str, err: &IngestError) -> Self {
        PublishResult::Failed {
            entry_id: entry_id.to_string(),
            code: err.code().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn entry_id(&self) -> &str {
        match self {
            PublishResult::Acknowledged { entry_id, .. } | PublishResult::Failed { entry_id, .. } => entry_id,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, PublishResult::Acknowledged { .. })
    }

    /// The entry's failure as a report item, `None` when acknowledged
    pub fn to_failure(&self) -> Option<ItemFailure> {
        match self {
            PublishResult::Acknowledged { .. } => None,
            PublishResult::Failed {
                entry_id,
                code,
                reason,
            } => Some(ItemFailure {
                stage: Stage::Publish,
                subject: entry_id.clone(),
                code: code.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// A chunk whose batch call failed as a whole
#[derive(Debug)]
pub struct ChunkError {
    pub chunk: usize,
    pub error: IngestError,
}

/// Aggregated result of a publish
#[derive(Debug, Default)]
pub struct PublishReport {
    /// One result per entry, in entry order
    pub results: Vec<PublishResult>,
    /// Number of batch calls issued
    pub batches: usize,
    pub chunk_errors: Vec<ChunkError>,
}

impl PublishReport {
    pub fn acknowledged(&self) -> usize {
        self.results.iter().filter(|r| r.is_acknowledged()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.acknowledged()
    }

    /// One [`ItemFailure`] per failed entry, in entry order
    pub fn failures(&self) -> impl Iterator<Item = ItemFailure> + '_ {
        self.results.iter().filter_map(PublishResult::to_failure)
    }
}

/// Publishes offers to one destination queue
pub struct BatchPublisher {
    transport: Arc<dyn QueueTransport>,
    destination: String,
}

impl BatchPublisher {
    pub fn new(transport: Arc<dyn QueueTransport>, destination: impl Into<String>) -> Self {
        Self {
            transport,
            destination: destination.into(),
        }
    }

    /// Publish `offers`, one batch call per chunk.
    ///
    /// Per-entry and per-chunk failures are reported in the returned
    /// [`PublishReport`]. An `Err` means the offers could not be turned into
    /// valid batches at all.
    #[instrument(skip(self, offers), fields(destination = %self.destination, offers = offers.len()))]
    pub async fn publish(&self, offers: &[Offer]) -> Result<PublishReport> {
        if offers.is_empty() {
            debug!("Nothing to publish");
            return Ok(PublishReport::default());
        }

        let entries = offers
            .iter()
            .enumerate()
            .map(|(position, offer)| -> Result<BatchEntry> {
                Ok(BatchEntry {
                    id: position.to_string(),
                    body: serde_json::to_string(offer)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let chunks = partition(&entries, TRANSPORT_BATCH_CEILING);
        for chunk in &chunks {
            check_batch_size(chunk.len())?;
        }

        let sends = chunks.iter().map(|chunk| self.transport.send_batch(&self.destination, chunk.to_vec()));
        let responses = join_all(sends).await;

        let mut report = PublishReport {
            results: Vec::with_capacity(entries.len()),
            batches: chunks.len(),
            chunk_errors: Vec::new(),
        };

        for (index, (chunk, response)) in chunks.iter().zip(responses).enumerate() {
            match response {
                Ok(acks) => report.results.extend(reconcile(chunk, acks)),
                Err(err) => {
                    error!(chunk = index, entries = chunk.len(), error = %err, "Batch send failed");
                    report
                        .results
                        .extend(chunk.iter().map(|entry| PublishResult::failed(&entry.id, &err)));
                    report.chunk_errors.push(ChunkError { chunk: index, error: err });
                },
            }
        }

        info!(
            batches = report.batches,
            acknowledged = report.acknowledged(),
            failed = report.failed(),
            "Publish complete"
        );
        Ok(report)
    }
}

/// Match acknowledgements to the entries of one chunk, in entry order.
fn reconcile(chunk: &[BatchEntry], acks: Vec<BatchAck>) -> Vec<PublishResult> {
    let mut by_id: HashMap<String, BatchAck> = acks.into_iter().map(|ack| (ack.id().to_string(), ack)).collect();

    chunk
        .iter()
        .map(|entry| match by_id.remove(&entry.id) {
            Some(BatchAck::Delivered {
                message_id,
                md5_of_body,
                ..
            }) => match verify_fingerprint(entry.body.as_bytes(), &md5_of_body) {
                Ok(()) => PublishResult::Acknowledged {
                    entry_id: entry.id.clone(),
                    message_id,
                    fingerprint: md5_of_body,
                },
                Err(err) => {
                    warn!(entry_id = %entry.id, error = %err, "Acknowledged body fingerprint does not match");
                    PublishResult::failed(&entry.id, &IngestError::from(err))
                },
            },
            Some(BatchAck::Rejected { code, message, .. }) => PublishResult::Failed {
                entry_id: entry.id.clone(),
                code,
                reason: message,
            },
            None => PublishResult::Failed {
                entry_id: entry.id.clone(),
                code: "missing_ack".to_string(),
                reason: "transport returned no acknowledgement for entry".to_string(),
            },
        })
        .collect()
}
