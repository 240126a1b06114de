//! LLM provider abstractions for Parley.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `TokenBudget`: context window allocation and the summarization trigger

pub mod box_provider;
pub mod provider;
pub mod token_budget;
