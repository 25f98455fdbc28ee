//! Sports registry access
//!
//! The registry serves the league taxonomy and team/player records. Stages
//! depend on the [`RegistryApi`] trait; [`RegistryClient`] is the HTTP
//! implementation.

use crate::error::Result;
use async_trait::async_trait;
use offerflow_common::types::{Group, Participant};
use serde_json::Value;

pub mod client;
pub mod endpoints;

pub use client::RegistryClient;

/// Read-only registry operations
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Fetch the root of the league taxonomy
    async fn league_taxonomy(&self) -> Result<Group>;

    /// Fetch the record of a team or player
    async fn participant(&self, participant: Participant) -> Result<Value>;
}
