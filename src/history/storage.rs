//! Key-value storage abstraction for client-side history
//!
//! The local history store only needs `get`/`set`/`remove` over string keys
//! and byte values. [`MemoryStorage`] backs tests; [`SledStorage`] persists
//! to disk for the command-line client.

use crate::error::{FormcraftError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Byte-oriented key-value storage
pub trait KeyValueStorage: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| FormcraftError::Storage("Memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| FormcraftError::Storage("Memory storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| FormcraftError::Storage("Memory storage lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Storage persisted in an embedded `sled` database
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open or create a database at `path`
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Storage` if the database cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| FormcraftError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Wrap an already opened database
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }
}

impl KeyValueStorage for SledStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| FormcraftError::Storage(format!("Get failed: {}", e)))?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| FormcraftError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| FormcraftError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| FormcraftError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| FormcraftError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}
