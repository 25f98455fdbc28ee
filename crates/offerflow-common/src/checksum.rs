//! Content fingerprints for published message bodies
//!
//! Queue transports acknowledge each sent message with the MD5 digest of its
//! body. These helpers compute the same digest locally so acknowledgements
//! can be checked against what was actually sent.

use crate::error::{CommonError, Result};

/// Compute the lowercase hex MD5 fingerprint of bytes
pub fn fingerprint(data: &[u8]) -> String {
    let digest = md5::compute(data);
    format!("{:x}", digest)
}

/// Verify a reported fingerprint (case-insensitive), returning the mismatch as an error
pub fn verify_fingerprint(data: &[u8], expected: &str) -> Result<()> {
    let actual = fingerprint(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(CommonError::FingerprintMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
