use async_trait::async_trait;
use vigil_core::{ClipHandle, Contact, Coordinates, StoreError};

/// Keyed record store shared by the monitoring loops.
///
/// Implementations must serialize concurrent access internally; the
/// passive monitor, keyword listener and location tracker all hold the
/// same trait object.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn add_guardian(&self, user_id: u64, contact: Contact) -> Result<(), StoreError>;

    /// Guardians in insertion order.
    async fn get_guardians(&self, user_id: u64) -> Result<Vec<Contact>, StoreError>;

    async fn save_position(&self, user_id: u64, position: Coordinates) -> Result<(), StoreError>;

    /// Most recently saved position, if any.
    async fn last_position(&self, user_id: u64) -> Result<Option<Coordinates>, StoreError>;

    async fn save_command_sample(
        &self,
        user_id: u64,
        text: &str,
        clip: ClipHandle,
    ) -> Result<(), StoreError>;

    async fn command_samples(&self, user_id: u64)
        -> Result<Vec<(String, ClipHandle)>, StoreError>;
}
