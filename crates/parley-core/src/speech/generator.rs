//! SpeechGenerator trait and the deferred (fetch-on-demand) implementation.

use std::time::Duration;

use chrono::Utc;
use parley_types::error::SpeechError;
use parley_types::speech::{AudioFormat, PendingSpeechEntry, SpeechReference};
use tokio_util::sync::CancellationToken;

use super::registry::PendingSpeechRegistry;

/// Typical conversational speaking rate used when a back-end does not report
/// audio length.
const WORDS_PER_MINUTE: f64 = 150.0;

/// Estimated playback length of `text` at a conversational speaking rate.
pub fn estimate_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count().max(1);
    Duration::from_secs_f64(words as f64 * 60.0 / WORDS_PER_MINUTE)
}

/// Produces speech for session replies.
pub trait SpeechGenerator: Send + Sync {
    /// Name of the speech service, recorded on registered entries.
    fn service_name(&self) -> &str;

    /// Prepare speech for `text` under `id`.
    ///
    /// Returns `Ok(None)` when speech is disabled or there is nothing to say.
    /// `reusable` entries survive retrieval and may be fetched repeatedly.
    fn create_speech(
        &self,
        text: &str,
        id: &str,
        reusable: bool,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<Option<SpeechReference>, SpeechError>> + Send;
}

/// Per-session speech settings.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub enabled: bool,
    pub service: String,
    pub voice: Option<String>,
    pub culture: String,
    pub format: AudioFormat,
    /// Base URL clients fetch audio from, without a trailing slash.
    pub public_base_url: String,
}

/// Registers pending entries and returns fetch URLs; synthesis happens when
/// the client fetches the URL.
#[derive(Debug, Clone)]
pub struct DeferredSpeechGenerator {
    registry: PendingSpeechRegistry,
    settings: SpeechSettings,
}

impl DeferredSpeechGenerator {
    pub fn new(registry: PendingSpeechRegistry, mut settings: SpeechSettings) -> Self {
        settings.public_base_url = settings.public_base_url.trim_end_matches('/').to_string();
        Self { registry, settings }
    }

    /// URL the client fetches entry `id` from.
    pub fn speech_url(&self, id: &str) -> String {
        format!("{}/api/v1/speech/{id}", self.settings.public_base_url)
    }
}

impl SpeechGenerator for DeferredSpeechGenerator {
    fn service_name(&self) -> &str {
        &self.settings.service
    }

    async fn create_speech(
        &self,
        text: &str,
        id: &str,
        reusable: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<SpeechReference>, SpeechError> {
        if !self.settings.enabled || text.trim().is_empty() {
            return Ok(None);
        }
        if cancel.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }

        let id = self.registry.register(PendingSpeechEntry {
            id: id.to_string(),
            service: self.settings.service.clone(),
            voice: self.settings.voice.clone(),
            culture: self.settings.culture.clone(),
            text: text.trim().to_string(),
            format: self.settings.format,
            reusable,
            created_at: Utc::now(),
        });
        tracing::debug!(speech_id = %id, reusable, "registered pending speech");

        Ok(Some(SpeechReference {
            url: self.speech_url(&id),
            id,
            duration: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool) -> SpeechSettings {
        SpeechSettings {
            enabled,
            service: "http".to_string(),
            voice: Some("en-female".to_string()),
            culture: "en-US".to_string(),
            format: AudioFormat::Mp3,
            public_base_url: "http://localhost:5384/".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_speech_registers_entry() {
        let registry = PendingSpeechRegistry::new();
        let generator = DeferredSpeechGenerator::new(registry.clone(), settings(true));

        let reference = generator
            .create_speech("Hello there.", "abc", false, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reference.url, "http://localhost:5384/api/v1/speech/abc");
        assert_eq!(reference.duration, None);
        let entry = registry.try_get("abc").unwrap();
        assert_eq!(entry.text, "Hello there.");
        assert_eq!(entry.voice.as_deref(), Some("en-female"));
        assert_eq!(entry.format, AudioFormat::Mp3);
        assert!(!entry.reusable);
    }

    #[tokio::test]
    async fn test_disabled_or_blank_returns_none() {
        let registry = PendingSpeechRegistry::new();
        let disabled = DeferredSpeechGenerator::new(registry.clone(), settings(false));
        let cancel = CancellationToken::new();
        assert!(
            disabled
                .create_speech("Hi", "a", false, &cancel)
                .await
                .unwrap()
                .is_none()
        );

        let enabled = DeferredSpeechGenerator::new(registry.clone(), settings(true));
        assert!(
            enabled
                .create_speech("   ", "b", false, &cancel)
                .await
                .unwrap()
                .is_none()
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_request_registers_nothing() {
        let registry = PendingSpeechRegistry::new();
        let generator = DeferredSpeechGenerator::new(registry.clone(), settings(true));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = generator
            .create_speech("Hi", "a", false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Cancelled));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration("one two three four five"), Duration::from_secs(2));
        assert_eq!(estimate_duration(""), Duration::from_millis(400));
    }
}
