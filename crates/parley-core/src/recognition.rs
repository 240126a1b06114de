//! Speech recognition port.
//!
//! A recognizer turns microphone audio into text events. Events flow back
//! to the session runner over an mpsc channel; only `Final` text becomes a
//! user message.

use parley_types::error::SpeechError;
use tokio::sync::mpsc;

/// Event emitted by a speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The user started speaking.
    Started,
    /// Interim transcript; may still change.
    Partial(String),
    /// Final transcript of one user utterance.
    Final(String),
}

/// Speech-to-text back-end for a session.
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Begin listening, delivering events to `events` until stopped.
    fn start(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), SpeechError>;

    fn stop(&self);
}

/// Recognizer used when no speech-to-text back-end is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSpeechRecognizer;

impl SpeechRecognizer for DisabledSpeechRecognizer {
    fn name(&self) -> &str {
        "disabled"
    }

    fn start(&self, _events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), SpeechError> {
        Err(SpeechError::Disabled("recognition".to_string()))
    }

    fn stop(&self) {}
}
