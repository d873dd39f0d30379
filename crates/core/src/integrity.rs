//! Content hashes of generated artifacts.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the bytes.
#[must_use]
pub fn hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Returns true if `expected` is the SHA-256 of the bytes, in any hex case.
#[must_use]
pub fn verify(bytes: &[u8], expected: &str) -> bool {
    hash(bytes).eq_ignore_ascii_case(expected.trim())
}
