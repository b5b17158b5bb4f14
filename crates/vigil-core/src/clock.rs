use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time, injected wherever timestamps are taken
/// (clip naming, passcode expiry, position capture times) so tests can
/// drive time deterministically.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
