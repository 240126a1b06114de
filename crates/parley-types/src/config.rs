//! Server configuration types for Parley.
//!
//! `ServerConfig` represents the top-level `config.toml`. Every section and
//! field has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};

use crate::character::UserProfile;
use crate::speech::AudioFormat;

/// Top-level configuration for a Parley server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub summarization: SummarizationConfig,
    pub profile: UserProfile,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients use to fetch speech audio.
    pub public_base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5384,
            public_base_url: "http://127.0.0.1:5384".to_string(),
        }
    }
}

/// Text-generation back-end settings (any OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Human-readable provider name used in logs and spans.
    pub provider: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub max_context_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 300,
            temperature: 0.8,
            max_context_tokens: 32_768,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Speech back-end name recorded on pending entries.
    pub service: String,
    /// HTTP endpoint of the synthesis back-end.
    pub endpoint: String,
    /// Voice used when the character does not name one.
    pub default_voice: Option<String>,
    pub format: AudioFormat,
    /// Filler lines pre-registered at chat start while the character thinks.
    pub thinking_speech: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service: "http".to_string(),
            endpoint: "http://127.0.0.1:5002/api/tts".to_string(),
            default_voice: None,
            format: AudioFormat::Wav,
            thinking_speech: vec!["Hmm...".to_string(), "Let me think.".to_string()],
        }
    }
}

/// Conversation summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    pub enabled: bool,
    /// Most recent utterances never folded into a summary.
    pub keep_recent: usize,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_recent: 10,
        }
    }
}
