//! Queue transport abstraction
//!
//! The pipeline only needs two operations from a queue: a bounded receive and
//! a bounded batch send. [`SqsTransport`] talks to Amazon SQS; [`MemoryQueue`]
//! keeps queues in process and records every call.

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod sqs;

pub use memory::{MemoryQueue, ReceiveCall, SendCall};
pub use sqs::{SqsConfig, SqsTransport};

/// Maximum number of entries in a single receive or batch send.
pub const TRANSPORT_BATCH_CEILING: usize = 10;

/// A message returned by a receive call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Transport-assigned message id
    pub message_id: String,
    /// Raw message body
    pub body: String,
}

/// One entry of a batch send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Entry id, unique within the batch
    pub id: String,
    /// Serialized message body
    pub body: String,
}

/// Per-entry result of a batch send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchAck {
    Delivered {
        id: String,
        message_id: String,
        md5_of_body: String,
    },
    Rejected {
        id: String,
        code: String,
        message: String,
        sender_fault: bool,
    },
}

impl BatchAck {
    /// Entry id this acknowledgement refers to
    pub fn id(&self) -> &str {
        match self {
            BatchAck::Delivered { id, .. } | BatchAck::Rejected { id, .. } => id,
        }
    }
}

/// Queue operations used by the pipeline
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receive up to `max_messages` messages; an empty vector means the queue is drained.
    async fn receive(&self, queue_url: &str, max_messages: usize) -> Result<Vec<ReceivedMessage>>;

    /// Send 1..=10 entries as a single batch, returning one acknowledgement per entry.
    async fn send_batch(&self, queue_url: &str, entries: Vec<BatchEntry>) -> Result<Vec<BatchAck>>;
}

/// Reject receive sizes the transport would refuse.
pub fn check_receive_size(max_messages: usize) -> Result<()> {
    if max_messages == 0 || max_messages > TRANSPORT_BATCH_CEILING {
        return Err(IngestError::TransportLimitExceeded {
            requested: max_messages,
            ceiling: TRANSPORT_BATCH_CEILING,
        });
    }
    Ok(())
}

/// Reject batch sizes the transport would refuse.
pub fn check_batch_size(entries: usize) -> Result<()> {
    if entries == 0 {
        return Err(IngestError::EmptyBatchRejected);
    }
    if entries > TRANSPORT_BATCH_CEILING {
        return Err(IngestError::TransportLimitExceeded {
            requested: entries,
            ceiling: TRANSPORT_BATCH_CEILING,
        });
    }
    Ok(())
}
