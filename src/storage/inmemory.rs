use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, StorageError};

pub struct InMemoryStore {
    pub entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries_lock = self
            .entries
            .lock()
            .map_err(|_| StorageError::OperationFailed("Lock poisoned".to_string()))?;

        Ok(entries_lock.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries_lock = self
            .entries
            .lock()
            .map_err(|_| StorageError::OperationFailed("Lock poisoned".to_string()))?;

        entries_lock.insert(key.to_string(), value);
        Ok(())
    }

    async fn multi_remove(&self, keys: Vec<String>) -> Result<(), StorageError> {
        let mut entries_lock = self
            .entries
            .lock()
            .map_err(|_| StorageError::OperationFailed("Lock poisoned".to_string()))?;

        for key in keys {
            entries_lock.remove(&key);
        }
        Ok(())
    }
}
