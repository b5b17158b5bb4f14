use vigil_core::AudioChunk;

/// Cheap loudness gate that decides whether a chunk warrants recording and
/// classification. Purely local: no side effects, no failure modes.
#[derive(Debug, Clone, Copy)]
pub struct AmplitudeGate {
    gain: f32,
    threshold: i32,
}

impl AmplitudeGate {
    pub fn new(gain: f32, threshold: i32) -> Self {
        Self { gain, threshold }
    }

    /// Peak absolute magnitude after applying the gain multiplier.
    pub fn adjusted_peak(&self, chunk: &AudioChunk) -> f32 {
        chunk.peak() as f32 * self.gain
    }

    /// True iff the gain-adjusted peak strictly exceeds the threshold.
    pub fn should_trigger(&self, chunk: &AudioChunk) -> bool {
        let peak = self.adjusted_peak(chunk);
        let loud = peak > self.threshold as f32;
        tracing::trace!(peak, loud, "amplitude check");
        loud
    }
}
