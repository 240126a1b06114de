//! SpeechSynthesizer trait: turns a pending entry into audio bytes.
//!
//! Implementations live in parley-infra (e.g., `HttpSpeechSynthesizer`).

use parley_types::error::SpeechError;
use parley_types::speech::PendingSpeechEntry;

pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize the entry's text in its voice and format.
    fn synthesize(
        &self,
        entry: &PendingSpeechEntry,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, SpeechError>> + Send;
}
