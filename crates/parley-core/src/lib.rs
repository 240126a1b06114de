//! Session orchestration and collaborator traits for Parley.
//!
//! This crate owns the real-time behaviour of a chat session: the preemptive
//! work queue, the activity tracker, interruption reconciliation and the
//! orchestrator that ties them together. It also defines the "ports" that
//! the infrastructure layer implements (LLM providers, speech synthesis,
//! persistence, hashing). It depends only on `parley-types` -- never on
//! `parley-infra` or any database/IO crate.

pub mod generation;
pub mod hash;
pub mod llm;
pub mod memory;
pub mod recognition;
pub mod repository;
pub mod session;
pub mod speech;
pub mod tunnel;

#[cfg(test)]
pub(crate) mod testing;
