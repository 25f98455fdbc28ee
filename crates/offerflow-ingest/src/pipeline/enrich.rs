//! Participant enrichment
//!
//! Every outcome with a usable participant descriptor becomes one lookup
//! slot addressed by `(offer index, outcome index)`. Slots are resolved
//! concurrently with a bounded number in flight, and each result is written
//! back to the position its slot names, so completion order never affects the
//! output order. Outcomes without a descriptor are not touched.

use super::report::{ItemFailure, Stage};
use crate::config::FailurePolicy;
use crate::error::{IngestError, Result};
use crate::registry::RegistryApi;
use futures::stream::{self, StreamExt};
use offerflow_common::types::{Offer, Participant};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Enriched offers plus any isolated lookup failures
#[derive(Debug, Default)]
pub struct EnrichOutcome {
    pub offers: Vec<Offer>,
    pub failures: Vec<ItemFailure>,
    /// Number of outcomes that received a participant payload
    pub enriched: usize,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    offer: usize,
    outcome: usize,
    participant: Participant,
}

/// Resolves participant info for offers through a [`RegistryApi`]
pub struct Enricher {
    registry: Arc<dyn RegistryApi>,
    concurrency: usize,
    lookup_timeout: Duration,
}

impl Enricher {
    pub fn new(registry: Arc<dyn RegistryApi>, concurrency: usize, lookup_timeout: Duration) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
            lookup_timeout,
        }
    }

    #[instrument(skip(self, offers), fields(offers = offers.len(), concurrency = self.concurrency))]
    pub async fn enrich(&self, mut offers: Vec<Offer>, policy: FailurePolicy) -> Result<EnrichOutcome> {
        let slots = collect_slots(&offers);
        debug!(lookups = slots.len(), "Dispatching participant lookups");

        let mut lookups = stream::iter(slots)
            .map(|slot| async move { (slot, self.lookup(slot.participant).await) })
            .buffer_unordered(self.concurrency);

        let mut failures = Vec::new();
        let mut enriched = 0usize;

        while let Some((slot, result)) = lookups.next().await {
            match result {
                Ok(info) => {
                    offers[slot.offer].outcomes[slot.outcome].participant_info = Some(info);
                    enriched += 1;
                },
                Err(err) => {
                    if policy == FailurePolicy::FailFast {
                        return Err(err);
                    }
                    let subject = format!("{}/{}", offers[slot.offer].id, slot.outcome);
                    warn!(subject = %subject, error = %err, "Leaving outcome un-enriched");
                    failures.push(ItemFailure::new(Stage::Enrich, subject, &err));
                },
            }
        }

        info!(enriched, failed = failures.len(), "Enrichment complete");
        Ok(EnrichOutcome {
            offers,
            failures,
            enriched,
        })
    }

    async fn lookup(&self, participant: Participant) -> Result<Value> {
        tokio::time::timeout(self.lookup_timeout, self.registry.participant(participant))
            .await
            .map_err(|_| IngestError::LookupTimeout {
                resource: participant.to_string(),
                timeout_ms: self.lookup_timeout.as_millis() as u64,
            })?
    }
}

fn collect_slots(offers: &[Offer]) -> Vec<Slot> {
    offers
        .iter()
        .enumerate()
        .flat_map(|(offer_idx, offer)| {
            offer
                .outcomes
                .iter()
                .enumerate()
                .filter_map(move |(outcome_idx, outcome)| {
                    outcome.participant().map(|participant| Slot {
                        offer: offer_idx,
                        outcome: outcome_idx,
                        participant,
                    })
                })
        })
        .collect()
}
