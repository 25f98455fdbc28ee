//! Offer pipeline
//!
//! One invocation runs the stages in sequence:
//!
//! 1. drain the source queue ([`drain`])
//! 2. fetch and flatten the league taxonomy ([`taxonomy`])
//! 3. drop offers outside the taxonomy ([`filter`])
//! 4. resolve participant info ([`enrich`])
//! 5. publish in bounded batches ([`publish`])
//!
//! Collaborators are passed in, so the same pipeline runs against SQS and
//! the HTTP registry or against in-memory fakes. The whole invocation is
//! bounded by the configured deadline.

pub mod drain;
pub mod enrich;
pub mod filter;
pub mod publish;
pub mod report;
pub mod taxonomy;

pub use drain::{DrainOutcome, QueueDrainer};
pub use enrich::{EnrichOutcome, Enricher};
pub use filter::filter_offers;
pub use publish::{chunk_count, partition, BatchPublisher, PublishReport, PublishResult};
pub use report::{ItemFailure, PipelineOutput, PipelineStats, Stage};
pub use taxonomy::{flatten, LeagueSet};

use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::{IngestError, Result};
use crate::registry::RegistryApi;
use crate::transport::QueueTransport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Drain → filter → enrich → publish, wired to its collaborators
pub struct Pipeline {
    drainer: QueueDrainer,
    registry: Arc<dyn RegistryApi>,
    enricher: Enricher,
    publisher: BatchPublisher,
    policy: FailurePolicy,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        transport: Arc<dyn QueueTransport>,
        registry: Arc<dyn RegistryApi>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            drainer: QueueDrainer::new(transport.clone(), config.source_queue_url.clone(), config.page_size)?,
            enricher: Enricher::new(registry.clone(), config.enrich_concurrency, config.lookup_timeout()),
            publisher: BatchPublisher::new(transport, config.destination_queue_url.clone()),
            registry,
            policy: config.failure_policy,
            deadline: config.deadline(),
        })
    }

    /// Run one invocation and return the published offers with a report.
    ///
    /// Under [`FailurePolicy::FailFast`] any failure aborts the run with no
    /// output. Under [`FailurePolicy::Isolate`] parse and lookup failures, and
    /// every entry that was not acknowledged, are collected into
    /// [`PipelineOutput::failures`].
    pub async fn run(&self) -> Result<PipelineOutput> {
        tokio::time::timeout(self.deadline, self.execute())
            .await
            .map_err(|_| IngestError::DeadlineExceeded(self.deadline))?
    }

    #[instrument(name = "pipeline", skip(self), fields(source = %self.drainer.queue_url(), policy = ?self.policy))]
    async fn execute(&self) -> Result<PipelineOutput> {
        let started = Instant::now();
        let mut stats = PipelineStats::started();

        let drained = self.drainer.drain(self.policy).await?;
        stats.receive_calls = drained.receive_calls;
        stats.drained = drained.offers.len() + drained.failures.len();
        let mut failures = drained.failures;

        let root = self.registry.league_taxonomy().await?;
        let leagues = flatten(&root)?;
        info!(leagues = leagues.len(), "League taxonomy flattened");

        let candidates = drained.offers.len();
        let kept = filter_offers(drained.offers, &leagues);
        stats.discarded = candidates - kept.len();

        let enriched = self.enricher.enrich(kept, self.policy).await?;
        stats.enriched_outcomes = enriched.enriched;
        failures.extend(enriched.failures);

        let mut report = self.publisher.publish(&enriched.offers).await?;
        stats.batches = report.batches;
        stats.acknowledged = report.acknowledged();
        stats.failed = report.failed();

        if let Some(pos) = report
            .chunk_errors
            .iter()
            .position(|chunk| matches!(chunk.error, IngestError::QueueUnavailable { .. }))
        {
            return Err(report.chunk_errors.swap_remove(pos).error);
        }

        if self.policy == FailurePolicy::FailFast && stats.failed > 0 {
            if !report.chunk_errors.is_empty() {
                let first = report.chunk_errors.swap_remove(0);
                warn!(chunk = first.chunk, "Aborting run on failed chunk");
                return Err(first.error);
            }
            return Err(IngestError::PublishFailed {
                failed: stats.failed,
                total: report.results.len(),
            });
        }

        failures.extend(report.failures());
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        if failures.is_empty() {
            info!(
                drained = stats.drained,
                published = enriched.offers.len(),
                batches = stats.batches,
                elapsed_ms = stats.elapsed_ms,
                "Pipeline run complete"
            );
        } else {
            warn!(
                drained = stats.drained,
                published = enriched.offers.len(),
                failures = failures.len(),
                elapsed_ms = stats.elapsed_ms,
                "Pipeline run completed with isolated failures"
            );
        }

        Ok(PipelineOutput {
            offers: enriched.offers,
            published: report.results,
            failures,
            stats,
        })
    }
}
