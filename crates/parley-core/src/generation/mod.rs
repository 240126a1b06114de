//! Text generation for sessions: replies, action selection and
//! conversation summaries, all through a shared [`BoxLlmProvider`].
//!
//! [`BoxLlmProvider`]: crate::llm::box_provider::BoxLlmProvider

pub mod action;
pub mod prompt;
pub mod reply;
pub mod summarizer;

use parley_types::config::LlmConfig;

/// Model parameters for reply generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}
