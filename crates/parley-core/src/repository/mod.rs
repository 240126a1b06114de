//! Repository trait definitions (ports).
//!
//! Implementations live in parley-infra.

pub mod character;
pub mod conversation;
