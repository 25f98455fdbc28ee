//! Offerflow Ingest Library
//!
//! Drains bet offers from a source queue, keeps the ones whose league is a
//! leaf of the registry's league taxonomy, enriches their outcomes with team
//! and player records, and republishes them in bounded batches.
//!
//! # Modules
//!
//! - [`pipeline`]: the stages and the [`Pipeline`] orchestrator
//! - [`transport`]: the queue abstraction with SQS and in-memory backends
//! - [`registry`]: the sports registry abstraction and its HTTP client
//! - [`config`]: environment-driven pipeline settings
//!
//! # Example
//!
//! ```no_run
//! use offerflow_ingest::{Pipeline, PipelineConfig, RegistryClient, SqsConfig, SqsTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let transport = Arc::new(SqsTransport::new(SqsConfig::from_env()?).await);
//!     let registry = Arc::new(RegistryClient::from_config(&config)?);
//!
//!     let output = Pipeline::new(&config, transport, registry)?.run().await?;
//!     println!("published {} offers", output.offers.len());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod transport;

pub use config::{FailurePolicy, PipelineConfig};
pub use error::{IngestError, Result};
pub use pipeline::{Pipeline, PipelineOutput};
pub use registry::{RegistryApi, RegistryClient};
pub use transport::{MemoryQueue, QueueTransport, SqsConfig, SqsTransport};
