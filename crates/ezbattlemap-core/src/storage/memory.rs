//! In-memory metadata store.

use super::{MetadataMap, MetadataStore, StorageError, StorageResult};
use std::sync::RwLock;

/// In-memory store for tests and throwaway libraries.
#[derive(Default)]
pub struct MemoryStore {
    saved: RwLock<Option<MetadataMap>>,
    read_only: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects every save.
    pub fn read_only() -> Self {
        Self {
            saved: RwLock::default(),
            read_only: true,
        }
    }

    /// Number of records in the last successful save.
    pub fn saved_len(&self) -> usize {
        self.saved
            .read()
            .map(|saved| saved.as_ref().map_or(0, MetadataMap::len))
            .unwrap_or(0)
    }
}

impl MetadataStore for MemoryStore {
    fn load(&self) -> StorageResult<MetadataMap> {
        let saved = self
            .saved
            .read()
            .map_err(|e| StorageError::Io(format!("Lock error: {}", e)))?;
        saved
            .clone()
            .ok_or_else(|| StorageError::NotFound("memory".to_string()))
    }

    fn save(&self, entries: &MetadataMap) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::Io("Store is read-only".to_string()));
        }
        let mut saved = self
            .saved
            .write()
            .map_err(|e| StorageError::Io(format!("Lock error: {}", e)))?;
        *saved = Some(entries.clone());
        Ok(())
    }
}
