pub mod adapter;
pub mod classifier_trait;
pub mod energy_classifier;
pub mod null_classifier;
pub mod null_transcriber;
pub mod registry;
pub mod transcriber_trait;

pub use adapter::ClassificationAdapter;
pub use classifier_trait::Classifier;
pub use energy_classifier::EnergyClassifier;
pub use null_classifier::NullClassifier;
pub use null_transcriber::NullTranscriber;
pub use registry::ClassifierRegistry;
pub use transcriber_trait::Transcriber;
