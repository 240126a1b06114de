//! HTTP text-to-speech back-end.
//!
//! POSTs a JSON body to a TTS server and takes the response body as audio:
//! ```text
//! { "text": "...", "voice": "kate", "culture": "en-US", "format": "wav" }
//! ```

use std::time::Duration;

use parley_core::speech::synthesizer::SpeechSynthesizer;
use parley_types::config::SpeechConfig;
use parley_types::error::SpeechError;
use parley_types::speech::{AudioFormat, PendingSpeechEntry};
use serde::Serialize;

/// Request body sent to the TTS server.
#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    culture: &'a str,
    format: AudioFormat,
}

impl<'a> SynthesisRequest<'a> {
    fn from_entry(entry: &'a PendingSpeechEntry, default_voice: Option<&'a str>) -> Self {
        Self {
            text: &entry.text,
            voice: entry.voice.as_deref().or(default_voice),
            culture: &entry.culture,
            format: entry.format,
        }
    }
}

pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    service: String,
    endpoint: String,
    default_voice: Option<String>,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SpeechError::Backend(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            service: config.service.clone(),
            endpoint: config.endpoint.clone(),
            default_voice: config.default_voice.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn name(&self) -> &str {
        &self.service
    }

    async fn synthesize(&self, entry: &PendingSpeechEntry) -> Result<Vec<u8>, SpeechError> {
        let body = SynthesisRequest::from_entry(entry, self.default_voice.as_deref());

        let response = self
            .client
            .post(&self.endpoint)
            .header("accept", entry.format.content_type())
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Backend(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Backend(format!("HTTP {status}: {error_body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Backend(format!("failed to read audio: {e}")))?;

        if bytes.is_empty() {
            return Err(SpeechError::Backend("empty audio response".to_string()));
        }

        tracing::debug!(
            speech.id = %entry.id,
            bytes = bytes.len(),
            "synthesized speech"
        );
        Ok(bytes.to_vec())
    }
}
