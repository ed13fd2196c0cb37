//! ContentHasher trait for deriving question identity hashes.
//!
//! Defined in mockloop-core so the orchestrator can de-duplicate questions
//! without coupling to a specific hashing algorithm. The `Sha256ContentHasher`
//! adapter lives in mockloop-infra.

/// Abstraction over content hashing.
///
/// The hash must be a pure function of the text: two interviews asking the
/// same question text resolve to the same canonical Question row.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
