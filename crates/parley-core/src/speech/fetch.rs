//! Resolves a pending speech id into audio.

use std::sync::Arc;

use dashmap::DashMap;
use parley_types::error::SpeechError;
use parley_types::speech::AudioFormat;

use super::registry::PendingSpeechRegistry;
use super::synthesizer::SpeechSynthesizer;

/// Synthesized audio ready to be served.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub format: AudioFormat,
    pub bytes: Arc<Vec<u8>>,
}

/// Serves pending speech entries through a synthesizer.
///
/// One-shot entries are claimed out of the registry before synthesis, so
/// concurrent fetches cannot both serve them; a failed synthesis puts the
/// entry back. Reusable entries stay registered and their audio is cached.
pub struct SpeechFetcher<S> {
    registry: PendingSpeechRegistry,
    synthesizer: S,
    cache: DashMap<String, Arc<Vec<u8>>>,
}

impl<S: SpeechSynthesizer> SpeechFetcher<S> {
    pub fn new(registry: PendingSpeechRegistry, synthesizer: S) -> Self {
        Self {
            registry,
            synthesizer,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &PendingSpeechRegistry {
        &self.registry
    }

    #[tracing::instrument(name = "speech.fetch", skip(self), fields(service = self.synthesizer.name()))]
    pub async fn fetch(&self, id: &str) -> Result<SpeechAudio, SpeechError> {
        let entry = self
            .registry
            .claim(id)
            .ok_or_else(|| SpeechError::NotFound(id.to_string()))?;

        if entry.reusable {
            if let Some(bytes) = self.cache.get(id) {
                return Ok(SpeechAudio {
                    format: entry.format,
                    bytes: Arc::clone(bytes.value()),
                });
            }
        }

        let bytes = match self.synthesizer.synthesize(&entry).await {
            Ok(bytes) => Arc::new(bytes),
            Err(e) => {
                if !entry.reusable {
                    self.registry.register(entry);
                }
                return Err(e);
            }
        };
        if entry.reusable {
            self.cache.insert(id.to_string(), Arc::clone(&bytes));
        }
        tracing::debug!(bytes = bytes.len(), reusable = entry.reusable, "speech synthesized");

        Ok(SpeechAudio {
            format: entry.format,
            bytes,
        })
    }
}
