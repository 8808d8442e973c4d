use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, warn};

use crate::storage::{KeyValueStore, StorageError};

pub type Preferences = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Preferences storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    #[error("Malformed preferences: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Free-form user preferences kept as one JSON object
pub struct PreferencesStore<S: KeyValueStore> {
    storage: Arc<S>,
    key: String,
}

impl<S: KeyValueStore> PreferencesStore<S> {
    pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Replaces the stored preferences
    pub async fn save(&self, preferences: &Preferences) -> bool {
        match self.write(preferences).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save preferences: {}", e);
                false
            }
        }
    }

    /// The stored preferences, or an empty object when none can be read
    pub async fn get(&self) -> Preferences {
        match self.read().await {
            Ok(preferences) => preferences,
            Err(PreferencesError::Malformed(e)) => {
                warn!("Ignoring malformed preferences: {}", e);
                Preferences::new()
            }
            Err(e) => {
                error!("Failed to load preferences: {}", e);
                Preferences::new()
            }
        }
    }

    async fn write(&self, preferences: &Preferences) -> Result<(), PreferencesError> {
        let json = serde_json::to_string(preferences)?;
        self.storage.set(&self.key, json).await?;
        Ok(())
    }

    async fn read(&self) -> Result<Preferences, PreferencesError> {
        let Some(json) = self.storage.get(&self.key).await? else {
            return Ok(Preferences::new());
        };

        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{Preferences, PreferencesStore};
    use crate::storage::{
        KeyValueStore, MockKeyValueStore, StorageError, StorageKeys, inmemory::InMemoryStore,
    };

    fn preferences(value: serde_json::Value) -> Preferences {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_saved_preferences_are_returned() {
        let storage = Arc::new(InMemoryStore::new());
        let store = PreferencesStore::new(storage, StorageKeys::default().user_preferences);

        let prefs = preferences(json!({ "maxDistanceKm": 25, "showMe": "everyone" }));
        assert!(store.save(&prefs).await);

        assert_eq!(store.get().await, prefs);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_preferences_read_as_empty() {
        let storage = Arc::new(InMemoryStore::new());
        let key = StorageKeys::default().user_preferences;
        let store = PreferencesStore::new(storage.clone(), key.clone());

        assert!(store.get().await.is_empty());

        storage.set(&key, "[1, 2, 3]".to_string()).await.unwrap();
        assert!(store.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failures_are_absorbed() {
        let mut mock_storage = MockKeyValueStore::new();
        mock_storage
            .expect_get()
            .returning(|_| Err(StorageError::OperationFailed("offline".to_string())));
        mock_storage
            .expect_set()
            .returning(|_, _| Err(StorageError::OperationFailed("offline".to_string())));

        let store = PreferencesStore::new(Arc::new(mock_storage), "prefs");

        assert!(store.get().await.is_empty());
        assert!(!store.save(&preferences(json!({ "darkMode": true }))).await);
    }
}
