pub mod capture;
pub mod device;
pub mod gate;
pub mod source;
pub mod window;

pub use capture::{CaptureHandle, CaptureStatus, MicCapture};
pub use device::DeviceManager;
pub use gate::AmplitudeGate;
pub use source::{AudioSource, ChannelSource};
pub use window::{RecordedClip, RecordingWindow};
