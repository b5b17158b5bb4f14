use crate::classifier_trait::Classifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use vigil_core::{ClassifyError, ClipHandle};

const DEFAULT_REFERENCE_PEAK: f32 = 8000.0;

/// Heuristic classifier scoring by mean absolute amplitude of the stored
/// clip, normalized against a reference level. A stand-in for a trained
/// model: loud sustained audio scores high, speech and silence score low.
pub struct EnergyClassifier {
    reference_bits: AtomicU32,
}

impl EnergyClassifier {
    pub fn new() -> Self {
        Self {
            reference_bits: AtomicU32::new(DEFAULT_REFERENCE_PEAK.to_bits()),
        }
    }

    fn reference_peak(&self) -> f32 {
        f32::from_bits(self.reference_bits.load(Ordering::Relaxed))
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for EnergyClassifier {
    fn name(&self) -> &str {
        "energy"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), ClassifyError> {
        let reference = config
            .get("reference_peak")
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)));
        if let Some(reference) = reference {
            if reference <= 0.0 {
                return Err(ClassifyError::InitializationFailed(format!(
                    "reference_peak must be positive, got {reference}"
                )));
            }
            self.reference_bits
                .store((reference as f32).to_bits(), Ordering::Relaxed);
        }
        Ok(())
    }

    async fn score(&self, clip: &ClipHandle) -> Result<f32, ClassifyError> {
        let mut reader = hound::WavReader::open(&clip.path)
            .map_err(|e| ClassifyError::ClipRead(e.to_string()))?;

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| ClassifyError::ClipRead(e.to_string()))?;
            sum += (sample as f64).abs();
            count += 1;
        }
        if count == 0 {
            return Ok(0.0);
        }

        let mean_abs = (sum / count as f64) as f32;
        let score = (mean_abs / self.reference_peak()).clamp(0.0, 1.0);
        tracing::debug!(clip = %clip.path.display(), mean_abs, score, "energy score");
        Ok(score)
    }
}
