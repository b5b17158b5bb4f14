use crate::source::ChannelSource;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use vigil_core::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Ok,
    Error,
    Disabled,
}

// ── CaptureHandle ─────────────────────────────────────────────

#[derive(Clone)]
pub struct CaptureHandle {
    enabled: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl CaptureHandle {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::Relaxed);
    }

    pub fn status(&self) -> CaptureStatus {
        match self.status.load(Ordering::Relaxed) {
            1 => CaptureStatus::Error,
            2 => CaptureStatus::Disabled,
            _ => CaptureStatus::Ok,
        }
    }

    pub fn set_status(&self, s: CaptureStatus) {
        let v = match s {
            CaptureStatus::Ok => 0,
            CaptureStatus::Error => 1,
            CaptureStatus::Disabled => 2,
        };
        self.status.store(v, Ordering::Relaxed);
    }
}

// ── MicCapture ────────────────────────────────────────────────

/// cpal input stream bridged into a [`ChannelSource`]. The stream callback
/// forwards each hardware buffer as one chunk; the monitoring loops consume
/// them through the `AudioSource` trait.
pub struct MicCapture {
    _stream: Stream,
}

impl MicCapture {
    pub fn new(
        device: &Device,
        sample_rate: u32,
        channels: u16,
        chunk_size: u32,
    ) -> Result<(Self, CaptureHandle, ChannelSource), CaptureError> {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(chunk_size),
        };

        let (chunk_tx, source) = ChannelSource::new(sample_rate, channels);

        let enabled = Arc::new(AtomicBool::new(true));
        let enabled_flag = Arc::clone(&enabled);
        let status = Arc::new(AtomicU8::new(0));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
            status_flag.store(1, Ordering::Relaxed); // Error
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !enabled_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    // Receiver dropped means the consuming loop stopped;
                    // nothing to do from the audio callback.
                    let _ = chunk_tx.send(data.to_vec());
                },
                err_callback,
                None,
            )
            .map_err(|e| CaptureError::StreamBuild(e.to_string()))?;

        let handle = CaptureHandle { enabled, status };
        Ok((Self { _stream: stream }, handle, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_capture_handle() -> CaptureHandle {
        CaptureHandle {
            enabled: Arc::new(AtomicBool::new(true)),
            status: Arc::new(AtomicU8::new(0)),
        }
    }

    #[test]
    fn test_capture_handle_default_enabled() {
        let handle = make_capture_handle();
        assert!(handle.is_enabled());
    }

    #[test]
    fn test_capture_handle_disable() {
        let handle = make_capture_handle();
        handle.set_enabled(false);
        assert!(!handle.is_enabled());
        handle.set_enabled(true);
        assert!(handle.is_enabled());
    }

    #[test]
    fn test_capture_handle_clone_shares_state() {
        let h1 = make_capture_handle();
        let h2 = h1.clone();
        h1.set_enabled(false);
        assert!(!h2.is_enabled());
    }

    #[test]
    fn test_capture_handle_status_default_ok() {
        let handle = make_capture_handle();
        assert_eq!(handle.status(), CaptureStatus::Ok);
    }

    #[test]
    fn test_capture_handle_set_error_status() {
        let handle = make_capture_handle();
        handle.set_status(CaptureStatus::Error);
        assert_eq!(handle.status(), CaptureStatus::Error);
        handle.set_status(CaptureStatus::Ok);
        assert_eq!(handle.status(), CaptureStatus::Ok);
    }
}
