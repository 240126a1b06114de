//! Configuration for the OpenAI-compatible provider.
//!
//! Any server speaking the chat completions protocol works: OpenAI itself,
//! or a local server such as llama.cpp, vLLM or Ollama behind `/v1`.

use parley_types::config::LlmConfig;
use parley_types::llm::ProviderCapabilities;
use secrecy::SecretString;

/// Configuration used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name, used in logs and spans.
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key; empty for local servers that do not check it.
    pub api_key: SecretString,
    /// Default model when a request leaves it empty.
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

impl OpenAiCompatConfig {
    /// Build from the `[llm]` section of the server config.
    pub fn from_llm_config(config: &LlmConfig, api_key: SecretString) -> Self {
        Self {
            provider_name: config.provider.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            capabilities: ProviderCapabilities {
                max_context_tokens: config.max_context_tokens,
                max_output_tokens: config
                    .max_tokens
                    .max(ProviderCapabilities::default().max_output_tokens),
            },
        }
    }
}
