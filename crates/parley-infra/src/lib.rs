//! Infrastructure adapters for Parley.
//!
//! Implements the repository and service traits defined in `parley-core`:
//! SQLite conversation storage, TOML character files, an OpenAI-compatible
//! LLM provider, an HTTP text-to-speech back-end, and SHA-256 hashing.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod llm;
pub mod speech;
pub mod sqlite;
