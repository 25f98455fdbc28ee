//! In-process queue transport
//!
//! Holds named FIFO queues in memory and enforces the same limits as SQS:
//! receive sizes above the ceiling, empty batches, oversized batches and
//! unknown queue URLs are all rejected. Every call is recorded so callers can
//! inspect how a queue was used.

use super::{check_batch_size, check_receive_size, BatchAck, BatchEntry, QueueTransport, ReceivedMessage};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use offerflow_common::checksum::fingerprint;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A recorded receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveCall {
    pub queue_url: String,
    pub max_messages: usize,
    pub returned: usize,
}

/// A recorded batch send call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCall {
    pub queue_url: String,
    pub entry_ids: Vec<String>,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<String>>,
    receive_calls: Vec<ReceiveCall>,
    send_calls: Vec<SendCall>,
    failing_sends: HashSet<usize>,
    corrupt_fingerprints: bool,
}

/// In-memory [`QueueTransport`]
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue at `queue_url`
    pub async fn create_queue(&self, queue_url: &str) {
        self.state
            .lock()
            .await
            .queues
            .entry(queue_url.to_string())
            .or_default();
    }

    /// Append raw message bodies to a queue, creating it if needed
    pub async fn push_bodies<I, S>(&self, queue_url: &str, bodies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock().await;
        let queue = state.queues.entry(queue_url.to_string()).or_default();
        queue.extend(bodies.into_iter().map(Into::into));
    }

    /// Serialize values as JSON and append them to a queue
    pub async fn push_json<T: serde::Serialize>(&self, queue_url: &str, values: &[T]) -> Result<()> {
        let bodies = values
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.push_bodies(queue_url, bodies).await;
        Ok(())
    }

    /// Make the `call_index`-th batch send (0-based, across all queues) fail
    pub async fn fail_send_call(&self, call_index: usize) {
        self.state.lock().await.failing_sends.insert(call_index);
    }

    /// Report wrong body fingerprints in every acknowledgement
    pub async fn corrupt_fingerprints(&self) {
        self.state.lock().await.corrupt_fingerprints = true;
    }

    /// Bodies currently waiting in a queue, oldest first
    pub async fn messages(&self, queue_url: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .queues
            .get(queue_url)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn receive_calls(&self) -> Vec<ReceiveCall> {
        self.state.lock().await.receive_calls.clone()
    }

    pub async fn send_calls(&self) -> Vec<SendCall> {
        self.state.lock().await.send_calls.clone()
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn receive(&self, queue_url: &str, max_messages: usize) -> Result<Vec<ReceivedMessage>> {
        check_receive_size(max_messages)?;

        let mut state = self.state.lock().await;
        let queue = state
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| IngestError::queue_unavailable(queue_url, "the specified queue does not exist"))?;

        let take = max_messages.min(queue.len());
        let messages: Vec<ReceivedMessage> = queue
            .drain(..take)
            .map(|body| ReceivedMessage {
                message_id: Uuid::new_v4().to_string(),
                body,
            })
            .collect();

        state.receive_calls.push(ReceiveCall {
            queue_url: queue_url.to_string(),
            max_messages,
            returned: messages.len(),
        });

        Ok(messages)
    }

    async fn send_batch(&self, queue_url: &str, entries: Vec<BatchEntry>) -> Result<Vec<BatchAck>> {
        let mut state = self.state.lock().await;
        if !state.queues.contains_key(queue_url) {
            return Err(IngestError::queue_unavailable(
                queue_url,
                "the specified queue does not exist",
            ));
        }

        let call_index = state.send_calls.len();
        state.send_calls.push(SendCall {
            queue_url: queue_url.to_string(),
            entry_ids: entries.iter().map(|entry| entry.id.clone()).collect(),
        });

        check_batch_size(entries.len())?;

        if state.failing_sends.contains(&call_index) {
            return Err(IngestError::transport(format!(
                "send batch {} to {} failed",
                call_index, queue_url
            )));
        }

        let corrupt = state.corrupt_fingerprints;
        let mut acks = Vec::with_capacity(entries.len());
        let mut bodies = Vec::with_capacity(entries.len());
        for entry in entries {
            let md5_of_body = if corrupt {
                fingerprint(format!("{}#corrupt", entry.body).as_bytes())
            } else {
                fingerprint(entry.body.as_bytes())
            };
            acks.push(BatchAck::Delivered {
                id: entry.id,
                message_id: Uuid::new_v4().to_string(),
                md5_of_body,
            });
            bodies.push(entry.body);
        }

        if let Some(queue) = state.queues.get_mut(queue_url) {
            queue.extend(bodies);
        }

        Ok(acks)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const QUEUE: &str = "memory://source";

    fn entries(count: usize) -> Vec<BatchEntry> {
        (0..count)
            .map(|i| BatchEntry {
                id: i.to_string(),
                body: format!("{{\"n\":{}}}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_receive_pages_in_order() {
        let queue = MemoryQueue::new();
        queue.push_bodies(QUEUE, ["a", "b", "c"]).await;

        let first = queue.receive(QUEUE, 2).await.unwrap();
        let second = queue.receive(QUEUE, 2).await.unwrap();
        let third = queue.receive(QUEUE, 2).await.unwrap();

        let bodies: Vec<_> = first.iter().chain(&second).map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
        assert!(third.is_empty());
        assert_eq!(queue.receive_calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_receive_unknown_queue() {
        let queue = MemoryQueue::new();
        let err = queue.receive("memory://missing", 10).await.unwrap_err();
        assert!(matches!(err, IngestError::QueueUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_receive_over_ceiling_is_rejected() {
        let queue = MemoryQueue::new();
        queue.create_queue(QUEUE).await;
        let err = queue.receive(QUEUE, 11).await.unwrap_err();
        assert!(matches!(err, IngestError::TransportLimitExceeded { .. }));
        assert!(queue.receive_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_batch_limits() {
        let queue = MemoryQueue::new();
        queue.create_queue(QUEUE).await;

        assert!(matches!(
            queue.send_batch(QUEUE, vec![]).await,
            Err(IngestError::EmptyBatchRejected)
        ));
        assert!(matches!(
            queue.send_batch(QUEUE, entries(11)).await,
            Err(IngestError::TransportLimitExceeded { .. })
        ));
        assert!(queue.messages(QUEUE).await.is_empty());
    }

    #[tokio::test]
    async fn test_send_batch_acknowledges_with_fingerprint() {
        let queue = MemoryQueue::new();
        queue.create_queue(QUEUE).await;

        let acks = queue.send_batch(QUEUE, entries(2)).await.unwrap();
        assert_eq!(acks.len(), 2);
        match &acks[1] {
            BatchAck::Delivered { id, md5_of_body, .. } => {
                assert_eq!(id, "1");
                assert_eq!(md5_of_body, &fingerprint(b"{\"n\":1}"));
            },
            other => panic!("unexpected ack: {other:?}"),
        }
        assert_eq!(queue.messages(QUEUE).await.len(), 2);
    }

    #[tokio::test]
    async fn test_fail_send_call() {
        let queue = MemoryQueue::new();
        queue.create_queue(QUEUE).await;
        queue.fail_send_call(0).await;

        assert!(queue.send_batch(QUEUE, entries(1)).await.is_err());
        assert!(queue.send_batch(QUEUE, entries(1)).await.is_ok());
        assert_eq!(queue.send_calls().await.len(), 2);
    }
}
