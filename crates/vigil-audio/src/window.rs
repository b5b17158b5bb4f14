use crate::source::AudioSource;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use vigil_core::{CaptureError, Clip, ClipHandle, Clock};

/// An accepted recording: the in-memory clip plus the durable handle the
/// classifier consumes.
#[derive(Debug)]
pub struct RecordedClip {
    pub clip: Clip,
    pub handle: ClipHandle,
}

/// Captures a fixed-duration clip once a gate or keyword trigger fires,
/// and persists accepted clips for audit/replay.
pub struct RecordingWindow {
    data_dir: PathBuf,
    user_id: u64,
    sample_rate: u32,
    channels: u16,
    chunk_size: u32,
    clock: Arc<dyn Clock>,
}

impl RecordingWindow {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        user_id: u64,
        sample_rate: u32,
        channels: u16,
        chunk_size: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            user_id,
            sample_rate,
            channels,
            chunk_size,
            clock,
        }
    }

    /// Pull chunks until the window is full or `cancel` flips.
    ///
    /// Returns `Ok(None)` when the window was cancelled before completion
    /// (truncated clips are never classified) or when the whole-clip peak
    /// falls below `min_peak`. A source failure mid-window propagates; the
    /// partial clip is discarded with it.
    pub async fn capture<S: AudioSource>(
        &self,
        source: &mut S,
        duration_secs: u32,
        min_peak: i32,
        prefix: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<RecordedClip>, CaptureError> {
        let target_chunks =
            ((duration_secs * self.sample_rate) / self.chunk_size).max(1) as usize;
        tracing::debug!(target_chunks, duration_secs, "recording window opened");

        let mut chunks = Vec::with_capacity(target_chunks);
        while chunks.len() < target_chunks {
            if *cancel.borrow() {
                tracing::debug!("recording cancelled, discarding partial clip");
                return Ok(None);
            }
            tokio::select! {
                chunk = source.next_chunk() => {
                    chunks.push(chunk?);
                }
                changed = cancel.changed() => {
                    // A closed cancel channel means the owning loop is
                    // gone; treat it like a cancellation.
                    if changed.is_err() || *cancel.borrow() {
                        tracing::debug!("recording cancelled, discarding partial clip");
                        return Ok(None);
                    }
                }
            }
        }

        let clip = Clip {
            chunks,
            sample_rate: self.sample_rate,
            channels: self.channels,
        };

        let peak = clip.peak();
        if peak < min_peak {
            tracing::debug!(peak, min_peak, "clip too quiet, discarding");
            return Ok(None);
        }

        let handle = self.persist(&clip, prefix)?;
        tracing::info!(path = %handle.path.display(), peak, "clip recorded");
        Ok(Some(RecordedClip { clip, handle }))
    }

    fn persist(&self, clip: &Clip, prefix: &str) -> Result<ClipHandle, CaptureError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| CaptureError::ClipWrite(e.to_string()))?;

        let filename = format!("{}_{}_{}.wav", prefix, self.user_id, self.clock.now_unix());
        let path = self.data_dir.join(filename);

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| CaptureError::ClipWrite(e.to_string()))?;
        for sample in clip.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::ClipWrite(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::ClipWrite(e.to_string()))?;

        Ok(ClipHandle { path })
    }
}
