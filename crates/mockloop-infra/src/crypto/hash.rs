//! SHA-256 content hashing for question de-duplication.
//!
//! Implements the `ContentHasher` trait from `mockloop-core` using the
//! `sha2` crate (RustCrypto ecosystem).

use sha2::{Digest, Sha256};

use mockloop_core::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`.
///
/// The lowercase hex digest of a question's text is its canonical key in
/// the `questions` table, so identical text always maps to one row.
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sha256ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        format!("{:x}", Sha256::digest(content.as_bytes()))
    }
}
