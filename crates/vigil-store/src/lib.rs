pub mod memory_store;
pub mod store_trait;

pub use memory_store::MemoryStore;
pub use store_trait::RecordStore;
