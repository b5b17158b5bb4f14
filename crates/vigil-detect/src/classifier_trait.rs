use async_trait::async_trait;
use vigil_core::{ClassifyError, ClipHandle};

/// A distress classifier over persisted clips.
///
/// Implementations are registered via [`ClassifierRegistry`](crate::ClassifierRegistry)
/// and score a stored clip in `[0, 1]`; the decision threshold lives in the
/// [`ClassificationAdapter`](crate::ClassificationAdapter), not here.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns the engine's plugin name (e.g. `"null"`, `"energy"`).
    fn name(&self) -> &str;
    /// One-time initialisation with engine-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), ClassifyError>;
    /// Score the stored clip; higher means more likely a distress event.
    async fn score(&self, clip: &ClipHandle) -> Result<f32, ClassifyError>;
}
