use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub seq: u64,
}

impl AudioChunk {
    /// Maximum absolute sample magnitude. Widened to i32 so that
    /// `i16::MIN` does not overflow on negation.
    pub fn peak(&self) -> i32 {
        self.samples
            .iter()
            .map(|&s| (s as i32).abs())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Clip {
    pub chunks: Vec<AudioChunk>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Clip {
    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(|c| c.samples.len()).sum()
    }

    pub fn peak(&self) -> i32 {
        self.chunks.iter().map(|c| c.peak()).max().unwrap_or(0)
    }

    /// Samples flattened across chunks, in capture order.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.chunks.iter().flat_map(|c| c.samples.iter().copied())
    }
}

/// Durable storage handle for an accepted clip. This is what the
/// classifier capability consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipHandle {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_distress: bool,
    pub raw_score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub number: String,
}

impl Contact {
    pub fn new(name: &str, number: &str) -> Self {
        Self {
            name: name.to_string(),
            number: number.to_string(),
        }
    }

    /// Canonical international form: numbers without a leading `+` get the
    /// configured country code prepended.
    pub fn normalized(&self, country_code: &str) -> Contact {
        if self.number.starts_with('+') {
            self.clone()
        } else {
            Contact {
                name: self.name.clone(),
                number: format!("{}{}", country_code, self.number),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: u64,
}

impl Coordinates {
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Opaque delivery receipt returned by the notifier capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);
