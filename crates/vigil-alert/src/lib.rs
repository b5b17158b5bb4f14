pub mod file_notifier;
pub mod geo_trait;
pub mod notify_trait;
pub mod orchestrator;
pub mod otp;
pub mod registry;
pub mod signals;
pub mod tracker;

pub use file_notifier::FileNotifier;
pub use geo_trait::{Geolocator, NullGeolocator, StaticGeolocator};
pub use notify_trait::Notifier;
pub use orchestrator::{AlertOrchestrator, EscalationSession};
pub use otp::OtpService;
pub use registry::NotifierRegistry;
pub use signals::{EscalationSignals, NoopSignals};
pub use tracker::LocationTracker;
