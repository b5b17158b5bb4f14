use async_trait::async_trait;
use tokio::sync::mpsc;
use vigil_core::{AudioChunk, CaptureError};

/// Continuous microphone capture abstracted into fixed-size chunks.
///
/// Chunks arrive strictly in capture order; gating decisions are
/// order-sensitive, so implementations must never reorder.
#[async_trait]
pub trait AudioSource: Send {
    async fn next_chunk(&mut self) -> Result<AudioChunk, CaptureError>;
}

/// Channel-fed audio source. The capture side (a cpal stream callback, or
/// a test feeding scripted chunks) pushes raw sample buffers into the
/// sender; this end stamps them with a monotonic sequence index.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Vec<i16>>,
    sample_rate: u32,
    channels: u16,
    next_seq: u64,
}

impl ChannelSource {
    pub fn new(sample_rate: u32, channels: u16) -> (mpsc::UnboundedSender<Vec<i16>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                sample_rate,
                channels,
                next_seq: 0,
            },
        )
    }
}

#[async_trait]
impl AudioSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<AudioChunk, CaptureError> {
        let samples = self.rx.recv().await.ok_or(CaptureError::SourceClosed)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(AudioChunk {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            seq,
        })
    }
}
