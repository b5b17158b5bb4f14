use crate::classifier_trait::Classifier;
use vigil_core::{ClassifyError, ClipHandle, Verdict};

/// Wraps a classifier engine and applies the decision threshold.
///
/// An `Err` here is a classification *failure*, not a negative verdict:
/// callers log it distinctly and treat it as "do not escalate" so that
/// engine faults stay distinguishable from genuine negatives.
pub struct ClassificationAdapter {
    engine: Box<dyn Classifier>,
    decision_threshold: f32,
}

impl ClassificationAdapter {
    pub fn new(engine: Box<dyn Classifier>, decision_threshold: f32) -> Self {
        Self {
            engine,
            decision_threshold,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub async fn classify(&self, clip: &ClipHandle) -> Result<Verdict, ClassifyError> {
        let score = self.engine.score(clip).await?;
        let verdict = Verdict {
            is_distress: score > self.decision_threshold,
            raw_score: score,
        };
        tracing::info!(
            clip = %clip.path.display(),
            score = verdict.raw_score,
            is_distress = verdict.is_distress,
            "clip classified"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FixedEngine(f32);

    #[async_trait]
    impl Classifier for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn initialize(&mut self, _config: toml::Value) -> Result<(), ClassifyError> {
            Ok(())
        }

        async fn score(&self, _clip: &ClipHandle) -> Result<f32, ClassifyError> {
            Ok(self.0)
        }
    }

    struct FaultyEngine;

    #[async_trait]
    impl Classifier for FaultyEngine {
        fn name(&self) -> &str {
            "faulty"
        }

        async fn initialize(&mut self, _config: toml::Value) -> Result<(), ClassifyError> {
            Ok(())
        }

        async fn score(&self, _clip: &ClipHandle) -> Result<f32, ClassifyError> {
            Err(ClassifyError::InferenceFailed("model exploded".to_string()))
        }
    }

    fn handle() -> ClipHandle {
        ClipHandle {
            path: PathBuf::from("data/emergency_1_123.wav"),
        }
    }

    #[tokio::test]
    async fn test_adapter_score_above_threshold_is_distress() {
        let adapter = ClassificationAdapter::new(Box::new(FixedEngine(0.9)), 0.0);
        let verdict = adapter.classify(&handle()).await.unwrap();
        assert!(verdict.is_distress);
        assert_eq!(verdict.raw_score, 0.9);
    }

    #[tokio::test]
    async fn test_adapter_score_at_threshold_is_negative() {
        let adapter = ClassificationAdapter::new(Box::new(FixedEngine(0.0)), 0.0);
        let verdict = adapter.classify(&handle()).await.unwrap();
        assert!(!verdict.is_distress);
        assert_eq!(verdict.raw_score, 0.0);
    }

    #[tokio::test]
    async fn test_adapter_custom_threshold() {
        let adapter = ClassificationAdapter::new(Box::new(FixedEngine(0.3)), 0.5);
        let verdict = adapter.classify(&handle()).await.unwrap();
        assert!(!verdict.is_distress);

        let adapter = ClassificationAdapter::new(Box::new(FixedEngine(0.6)), 0.5);
        let verdict = adapter.classify(&handle()).await.unwrap();
        assert!(verdict.is_distress);
    }

    #[tokio::test]
    async fn test_adapter_engine_failure_propagates() {
        let adapter = ClassificationAdapter::new(Box::new(FaultyEngine), 0.0);
        match adapter.classify(&handle()).await {
            Err(ClassifyError::InferenceFailed(msg)) => assert!(msg.contains("exploded")),
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_adapter_reports_engine_name() {
        let adapter = ClassificationAdapter::new(Box::new(FixedEngine(0.0)), 0.0);
        assert_eq!(adapter.engine_name(), "fixed");
    }
}
