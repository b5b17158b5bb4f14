use async_trait::async_trait;
use std::time::Duration;
use vigil_core::TranscribeError;

/// Speech-to-text seam for the keyword listener.
///
/// `Ok(None)` covers both "nothing heard before the timeout" and "could not
/// understand the speech" — the listener continues silently on either. An
/// `Err` is an engine fault and stops the listening loop.
#[async_trait]
pub trait Transcriber: Send {
    async fn listen_phrase(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, TranscribeError>;
}
