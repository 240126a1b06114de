//! BoxSpeechGenerator -- object-safe wrapper for SpeechGenerator.

use std::future::Future;
use std::pin::Pin;

use parley_types::error::SpeechError;
use parley_types::speech::SpeechReference;
use tokio_util::sync::CancellationToken;

use super::generator::SpeechGenerator;

type SpeechFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<SpeechReference>, SpeechError>> + Send + 'a>>;

/// Object-safe version of [`SpeechGenerator`] with boxed futures.
pub trait SpeechGeneratorDyn: Send + Sync {
    fn service_name(&self) -> &str;

    fn create_speech_boxed<'a>(
        &'a self,
        text: &'a str,
        id: &'a str,
        reusable: bool,
        cancel: &'a CancellationToken,
    ) -> SpeechFuture<'a>;
}

impl<T: SpeechGenerator> SpeechGeneratorDyn for T {
    fn service_name(&self) -> &str {
        SpeechGenerator::service_name(self)
    }

    fn create_speech_boxed<'a>(
        &'a self,
        text: &'a str,
        id: &'a str,
        reusable: bool,
        cancel: &'a CancellationToken,
    ) -> SpeechFuture<'a> {
        Box::pin(self.create_speech(text, id, reusable, cancel))
    }
}

/// Type-erased speech generator held by a session.
pub struct BoxSpeechGenerator {
    inner: Box<dyn SpeechGeneratorDyn + Send + Sync>,
}

impl BoxSpeechGenerator {
    pub fn new<T: SpeechGenerator + 'static>(generator: T) -> Self {
        Self {
            inner: Box::new(generator),
        }
    }

    pub fn service_name(&self) -> &str {
        self.inner.service_name()
    }

    pub async fn create_speech(
        &self,
        text: &str,
        id: &str,
        reusable: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<SpeechReference>, SpeechError> {
        self.inner
            .create_speech_boxed(text, id, reusable, cancel)
            .await
    }
}
