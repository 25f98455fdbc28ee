//! Offerflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Offerflow project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Offerflow workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Fingerprints**: MD5 content fingerprints matching what queue transports report
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: Bet offers, outcomes and the league taxonomy
//!
//! # Example
//!
//! ```no_run
//! use offerflow_common::checksum::{fingerprint, verify_fingerprint};
//!
//! fn check(body: &str, reported: &str) -> offerflow_common::Result<()> {
//!     verify_fingerprint(body.as_bytes(), reported)?;
//!     println!("body fingerprint {}", fingerprint(body.as_bytes()));
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
