//! Error types shared across Offerflow crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error type for the shared crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("Invalid participant kind: {0}")]
    InvalidParticipantKind(String),
}
