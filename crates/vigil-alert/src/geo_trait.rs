use async_trait::async_trait;
use std::sync::Arc;
use vigil_core::{Clock, Coordinates};

/// Live geolocation lookup. `None` means the lookup failed; callers fall
/// back to the last durably-stored position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Option<Coordinates>;
}

/// Reports a fixed position stamped with the current time. Stand-in for a
/// real geolocation provider in development and demos.
pub struct StaticGeolocator {
    latitude: f64,
    longitude: f64,
    clock: Arc<dyn Clock>,
}

impl StaticGeolocator {
    pub fn new(latitude: f64, longitude: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            latitude,
            longitude,
            clock,
        }
    }
}

#[async_trait]
impl Geolocator for StaticGeolocator {
    async fn current_position(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
            captured_at: self.clock.now_unix(),
        })
    }
}

/// Geolocator with no provider behind it; every lookup fails and callers
/// fall back to the last stored position.
pub struct NullGeolocator;

#[async_trait]
impl Geolocator for NullGeolocator {
    async fn current_position(&self) -> Option<Coordinates> {
        None
    }
}
