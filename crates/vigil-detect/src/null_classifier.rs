use crate::classifier_trait::Classifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vigil_core::{ClassifyError, ClipHandle};

/// Fixed-score classifier. The default engine so the pipeline runs without
/// a trained model present; also the workhorse of the test suites.
pub struct NullClassifier {
    score: Mutex<f32>,
    score_count: AtomicUsize,
}

impl NullClassifier {
    pub fn new() -> Self {
        Self {
            score: Mutex::new(0.0),
            score_count: AtomicUsize::new(0),
        }
    }

    pub fn score_count(&self) -> usize {
        self.score_count.load(Ordering::Relaxed)
    }
}

impl Default for NullClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for NullClassifier {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), ClassifyError> {
        if let Some(score) = config.get("score").and_then(|v| v.as_float()) {
            *self.score.lock().unwrap() = score as f32;
        }
        Ok(())
    }

    async fn score(&self, clip: &ClipHandle) -> Result<f32, ClassifyError> {
        let count = self.score_count.fetch_add(1, Ordering::Relaxed) + 1;
        let score = *self.score.lock().unwrap();
        tracing::trace!(
            clip = %clip.path.display(),
            score,
            "NullClassifier scored clip #{count}"
        );
        Ok(score)
    }
}
