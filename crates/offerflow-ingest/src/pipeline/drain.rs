//! Source queue drainage
//!
//! Pages are fetched one at a time until a receive comes back empty. Each
//! page is appended in the order the transport returned it, so the drained
//! sequence matches arrival order.

use super::report::{ItemFailure, Stage};
use crate::config::FailurePolicy;
use crate::error::{IngestError, Result};
use crate::transport::{QueueTransport, ReceivedMessage, TRANSPORT_BATCH_CEILING};
use offerflow_common::types::Offer;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Parsed result of a full drain
#[derive(Debug, Default)]
pub struct DrainOutcome {
    pub offers: Vec<Offer>,
    pub failures: Vec<ItemFailure>,
    pub receive_calls: usize,
}

/// Drains a queue page by page
pub struct QueueDrainer {
    transport: Arc<dyn QueueTransport>,
    queue_url: String,
    page_size: usize,
}

impl QueueDrainer {
    /// Create a drainer. `page_size` must be within `1..=TRANSPORT_BATCH_CEILING`.
    pub fn new(transport: Arc<dyn QueueTransport>, queue_url: impl Into<String>, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(IngestError::config("page size must be at least 1"));
        }
        if page_size > TRANSPORT_BATCH_CEILING {
            return Err(IngestError::TransportLimitExceeded {
                requested: page_size,
                ceiling: TRANSPORT_BATCH_CEILING,
            });
        }

        Ok(Self {
            transport,
            queue_url: queue_url.into(),
            page_size,
        })
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Receive until the queue returns an empty page.
    ///
    /// Returns the messages in arrival order together with the number of
    /// receive calls issued (including the final empty one).
    #[instrument(skip(self), fields(queue = %self.queue_url, page_size = self.page_size))]
    pub async fn drain_raw(&self) -> Result<(Vec<ReceivedMessage>, usize)> {
        let mut messages = Vec::new();
        let mut calls = 0usize;

        loop {
            let page = self.transport.receive(&self.queue_url, self.page_size).await?;
            calls += 1;

            if page.is_empty() {
                break;
            }

            debug!(page = calls, received = page.len(), "Received page");
            messages.extend(page);
        }

        info!(drained = messages.len(), receive_calls = calls, "Source queue drained");
        Ok((messages, calls))
    }

    /// Drain the queue and parse every body into an [`Offer`].
    pub async fn drain(&self, policy: FailurePolicy) -> Result<DrainOutcome> {
        let (messages, receive_calls) = self.drain_raw().await?;
        let mut outcome = DrainOutcome {
            offers: Vec::with_capacity(messages.len()),
            failures: Vec::new(),
            receive_calls,
        };

        for message in &messages {
            match parse_offer(message) {
                Ok(offer) => outcome.offers.push(offer),
                Err(err) => match policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::Isolate => {
                        warn!(message_id = %message.message_id, error = %err, "Skipping malformed record");
                        outcome
                            .failures
                            .push(ItemFailure::new(Stage::Drain, message.message_id.clone(), &err));
                    },
                },
            }
        }

        Ok(outcome)
    }
}

/// Parse a message body into an offer
pub fn parse_offer(message: &ReceivedMessage) -> Result<Offer> {
    serde_json::from_str(&message.body).map_err(|err| IngestError::malformed(message.message_id.clone(), err))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::MemoryQueue;
    use serde_json::json;

    const QUEUE: &str = "memory://source";

    fn offer_body(id: u64) -> String {
        json!({
            "id": id,
            "type": "match",
            "sport": "football",
            "leagueName": "Premier League",
            "leagueId": 1,
            "criterion": "Full Time",
            "outcomes": [{ "label": "1" }]
        })
        .to_string()
    }

    async fn queue_with(bodies: Vec<String>) -> Arc<MemoryQueue> {
        let queue = Arc::new(MemoryQueue::new());
        queue.create_queue(QUEUE).await;
        queue.push_bodies(QUEUE, bodies).await;
        queue
    }

    #[test]
    fn test_page_size_above_ceiling_is_rejected() {
        let queue = Arc::new(MemoryQueue::new());
        let result = QueueDrainer::new(queue, QUEUE, 11);
        assert!(matches!(result, Err(IngestError::TransportLimitExceeded { requested: 11, .. })));
    }

    #[test]
    fn test_zero_page_size_is_config_error() {
        let queue = Arc::new(MemoryQueue::new());
        assert!(matches!(QueueDrainer::new(queue, QUEUE, 0), Err(IngestError::Config(_))));
    }

    #[tokio::test]
    async fn test_drain_preserves_order_across_pages() {
        let queue = queue_with((1..=23).map(offer_body).collect()).await;
        let drainer = QueueDrainer::new(queue.clone(), QUEUE, 10).unwrap();

        let outcome = drainer.drain(FailurePolicy::FailFast).await.unwrap();
        let ids: Vec<u64> = outcome.offers.iter().map(|o| o.id).collect();

        assert_eq!(ids, (1..=23).collect::<Vec<_>>());
        assert_eq!(outcome.receive_calls, 4);

        let calls = queue.receive_calls().await;
        assert_eq!(calls.iter().map(|c| c.returned).collect::<Vec<_>>(), vec![10, 10, 3, 0]);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let queue = queue_with(vec![]).await;
        let drainer = QueueDrainer::new(queue, QUEUE, 10).unwrap();

        let outcome = drainer.drain(FailurePolicy::FailFast).await.unwrap();
        assert!(outcome.offers.is_empty());
        assert_eq!(outcome.receive_calls, 1);
    }

    #[tokio::test]
    async fn test_malformed_record_fails_fast() {
        let queue = queue_with(vec![offer_body(1), "not json".to_string()]).await;
        let drainer = QueueDrainer::new(queue, QUEUE, 10).unwrap();

        let err = drainer.drain(FailurePolicy::FailFast).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_malformed_record_isolated() {
        let queue = queue_with(vec![offer_body(1), "{\"id\": 2}".to_string(), offer_body(3)]).await;
        let drainer = QueueDrainer::new(queue, QUEUE, 10).unwrap();

        let outcome = drainer.drain(FailurePolicy::Isolate).await.unwrap();
        assert_eq!(outcome.offers.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, Stage::Drain);
        assert_eq!(outcome.failures[0].code, "malformed_record");
    }

    #[tokio::test]
    async fn test_missing_queue_is_unavailable() {
        let queue = Arc::new(MemoryQueue::new());
        let drainer = QueueDrainer::new(queue, "memory://missing", 10).unwrap();

        let err = drainer.drain_raw().await.unwrap_err();
        assert!(matches!(err, IngestError::QueueUnavailable { .. }));
    }
}
