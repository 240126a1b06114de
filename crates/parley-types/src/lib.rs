//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley server:
//! conversations, characters, session activity, pending speech, the client
//! wire protocol, LLM request shapes, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod activity;
pub mod character;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod protocol;
pub mod speech;
