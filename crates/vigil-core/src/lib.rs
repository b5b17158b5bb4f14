pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use error::{
    CaptureError, ClassifyError, ConfigError, DeliveryError, StoreError, TranscribeError,
};
pub use types::{AudioChunk, Clip, ClipHandle, Contact, Coordinates, MessageId, Verdict};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_creation() {
        let chunk = AudioChunk {
            samples: vec![0, 50, -50, 100],
            sample_rate: 44100,
            channels: 1,
            seq: 3,
        };
        assert_eq!(chunk.samples.len(), 4);
        assert_eq!(chunk.sample_rate, 44100);
        assert_eq!(chunk.seq, 3);
    }

    #[test]
    fn test_verdict_fields() {
        let verdict = Verdict {
            is_distress: true,
            raw_score: 0.9,
        };
        assert!(verdict.is_distress);
        assert_eq!(verdict.raw_score, 0.9);
    }

    #[test]
    fn test_contact_fields() {
        let contact = Contact::new("Asha", "+919990001");
        assert_eq!(contact.name, "Asha");
        assert_eq!(contact.number, "+919990001");
    }
}
