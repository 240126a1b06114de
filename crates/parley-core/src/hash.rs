//! ContentHasher trait for deriving stable content identifiers.
//!
//! The `Sha256ContentHasher` adapter lives in parley-infra.

/// Abstraction over content hashing.
///
/// Used to key reusable speech entries (e.g. thinking phrases) so the same
/// voice and text always map to the same fetch URL.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
