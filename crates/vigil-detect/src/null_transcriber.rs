use crate::transcriber_trait::Transcriber;
use async_trait::async_trait;
use std::time::Duration;
use vigil_core::TranscribeError;

/// Transcriber that hears nothing. Keeps the keyword loop runnable in
/// builds without a speech-to-text engine; every listen waits out the
/// timeout and reports silence.
pub struct NullTranscriber;

#[async_trait]
impl Transcriber for NullTranscriber {
    async fn listen_phrase(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, TranscribeError> {
        tokio::time::sleep(timeout).await;
        Ok(None)
    }
}
