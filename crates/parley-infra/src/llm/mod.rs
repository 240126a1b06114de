//! LLM provider implementations.
//!
//! [`create_provider`] builds the configured provider behind a
//! [`BoxLlmProvider`], resolving the API key from the environment.

pub mod openai_compat;

use secrecy::SecretString;

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_types::config::LlmConfig;
use parley_types::llm::{CompletionRequest, LlmError, Message};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Read the API key named by `api_key_env`, if it is set and non-empty.
pub fn resolve_api_key(config: &LlmConfig) -> Option<SecretString> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

/// Create a [`BoxLlmProvider`] from the `[llm]` config section.
///
/// Every supported back-end speaks the OpenAI chat completions protocol.
/// A missing key is only an error for the hosted OpenAI endpoint; local
/// servers usually accept any key.
pub fn create_provider(config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    let api_key = match resolve_api_key(config) {
        Some(key) => key,
        None if config.base_url.contains("api.openai.com") => {
            return Err(LlmError::AuthenticationFailed);
        }
        None => {
            tracing::debug!(
                "{} is not set, connecting to {} without an API key",
                config.api_key_env,
                config.base_url
            );
            SecretString::from(String::new())
        }
    };

    let provider =
        OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_llm_config(config, api_key));
    Ok(BoxLlmProvider::new(provider))
}

/// Send a minimal completion to verify the endpoint and key work.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
        stop_sequences: None,
    };
    provider.complete(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_for_local_endpoint_without_key() {
        let config = LlmConfig {
            provider: "local".to_string(),
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            api_key_env: "PARLEY_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_create_provider_for_openai_requires_key() {
        let config = LlmConfig {
            api_key_env: "PARLEY_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = LlmConfig {
            api_key_env: "PARLEY_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert!(resolve_api_key(&config).is_none());
    }
}
