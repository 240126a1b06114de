//! SHA-256 content hashing for speech entry ids.
//!
//! Reusable phrases (thinking speech) hash to the same id across sessions, so
//! their audio is synthesized once and served from cache afterwards.

use sha2::{Digest, Sha256};

use parley_core::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`, lowercase hex encoded.
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
        let digest = Sha256::digest(content.as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_known_value() {
        let hasher = Sha256ContentHasher::new();
        let hash = hasher.compute_hash("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_same_phrase_and_voice_share_an_id() {
        let hasher = Sha256ContentHasher::new();
        let first = hasher.compute_hash("kate\nHmm...");
        let second = hasher.compute_hash("kate\nHmm...");
        let other_voice = hasher.compute_hash("joe\nHmm...");
        assert_eq!(first, second);
        assert_ne!(first, other_voice);
    }

    #[test]
    fn test_sha256_hash_is_lowercase_hex() {
        let hasher = Sha256ContentHasher::new();
        let hash = hasher.compute_hash("test");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(hash.chars().all(|c| !c.is_ascii_uppercase()));
    }
}
