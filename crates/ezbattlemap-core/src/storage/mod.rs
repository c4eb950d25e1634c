//! Persistence of the library's metadata records.
//!
//! The whole id -> metadata map is rewritten on every save; there is no
//! append log or partial update.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::library::AssetMetadata;
use std::collections::BTreeMap;
use thiserror::Error;

/// Every metadata record keyed by asset id.
pub type MetadataMap = BTreeMap<String, AssetMetadata>;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Metadata not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend holding the persisted metadata map.
pub trait MetadataStore: Send + Sync {
    /// Load every record. Returns [`StorageError::NotFound`] if nothing was saved yet.
    fn load(&self) -> StorageResult<MetadataMap>;

    /// Replace the stored records with `entries`.
    fn save(&self, entries: &MetadataMap) -> StorageResult<()>;
}
