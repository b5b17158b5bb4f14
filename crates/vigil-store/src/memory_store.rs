use crate::store_trait::RecordStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use vigil_core::{ClipHandle, Contact, Coordinates, StoreError};

#[derive(Default)]
struct Records {
    guardians: HashMap<u64, Vec<Contact>>,
    positions: HashMap<u64, Vec<Coordinates>>,
    commands: HashMap<u64, Vec<(String, ClipHandle)>>,
}

/// In-memory record store. A single mutex serializes every access; this
/// is a low-throughput system and the loops only touch the store on
/// trigger events and periodic polls.
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Records>, StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn add_guardian(&self, user_id: u64, contact: Contact) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        tracing::debug!(user_id, name = %contact.name, "guardian added");
        records.guardians.entry(user_id).or_default().push(contact);
        Ok(())
    }

    async fn get_guardians(&self, user_id: u64) -> Result<Vec<Contact>, StoreError> {
        let records = self.lock()?;
        Ok(records.guardians.get(&user_id).cloned().unwrap_or_default())
    }

    async fn save_position(&self, user_id: u64, position: Coordinates) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        tracing::trace!(
            user_id,
            latitude = position.latitude,
            longitude = position.longitude,
            "position saved"
        );
        records.positions.entry(user_id).or_default().push(position);
        Ok(())
    }

    async fn last_position(&self, user_id: u64) -> Result<Option<Coordinates>, StoreError> {
        let records = self.lock()?;
        Ok(records
            .positions
            .get(&user_id)
            .and_then(|v| v.last())
            .copied())
    }

    async fn save_command_sample(
        &self,
        user_id: u64,
        text: &str,
        clip: ClipHandle,
    ) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        records
            .commands
            .entry(user_id)
            .or_default()
            .push((text.to_string(), clip));
        Ok(())
    }

    async fn command_samples(
        &self,
        user_id: u64,
    ) -> Result<Vec<(String, ClipHandle)>, StoreError> {
        let records = self.lock()?;
        Ok(records.commands.get(&user_id).cloned().unwrap_or_default())
    }
}
