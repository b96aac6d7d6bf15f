//! Storage Layer
//!
//! Durable side-store for evidence that must survive a page reload.
//! Keys follow `exam_<examId>_{violations,stats,tab_switches}`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;
use tracing::warn;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Abstract durable key-value store
pub trait SideStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read a non-negative integer counter.
/// Unparsable or negative values are treated as absent.
pub fn read_count(store: &dyn SideStore, key: &str) -> Result<Option<u32>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 0 => Ok(Some(u32::try_from(value).unwrap_or(u32::MAX))),
        Ok(value) => {
            warn!("Ignoring negative counter {} = {}", key, value);
            Ok(None)
        }
        Err(e) => {
            warn!("Ignoring unparsable counter {} = {:?}: {}", key, raw, e);
            Ok(None)
        }
    }
}

/// Write an integer counter as a decimal string
pub fn write_count(store: &dyn SideStore, key: &str, value: u32) -> Result<(), StorageError> {
    store.set(key, &value.to_string())
}
