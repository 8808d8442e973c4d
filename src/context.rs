use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::{
    accounts::store::AccountStore,
    preferences::PreferencesStore,
    settings::{Settings, StorageSettings},
    storage::{
        KeyValueStore, StorageError, StorageKeys, file::FileStore, inmemory::InMemoryStore,
        sqlite::SqliteStore,
    },
};

/// The key-value backend selected in the settings
pub enum StorageBackend {
    InMemory(InMemoryStore),
    Sqlite(SqliteStore),
    File(FileStore),
}

#[async_trait]
impl KeyValueStore for StorageBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            StorageBackend::InMemory(store) => store.get(key).await,
            StorageBackend::Sqlite(store) => store.get(key).await,
            StorageBackend::File(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        match self {
            StorageBackend::InMemory(store) => store.set(key, value).await,
            StorageBackend::Sqlite(store) => store.set(key, value).await,
            StorageBackend::File(store) => store.set(key, value).await,
        }
    }

    async fn multi_remove(&self, keys: Vec<String>) -> Result<(), StorageError> {
        match self {
            StorageBackend::InMemory(store) => store.multi_remove(keys).await,
            StorageBackend::Sqlite(store) => store.multi_remove(keys).await,
            StorageBackend::File(store) => store.multi_remove(keys).await,
        }
    }
}

pub struct AppContext {
    pub account_store: AccountStore<StorageBackend>,
    pub preferences_store: PreferencesStore<StorageBackend>,
}

impl AppContext {
    /// Opens the configured storage backend and builds the stores on top of it
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = match &settings.storage {
            StorageSettings::InMemory => {
                info!("using in-memory account storage");
                StorageBackend::InMemory(InMemoryStore::new())
            }
            StorageSettings::Sqlite { path } => {
                info!("using sqlite account storage at {}", path);
                StorageBackend::Sqlite(SqliteStore::connect(path).await?)
            }
            StorageSettings::File { path } => {
                let store = FileStore::new(path);
                info!("using file account storage at {:?}", store.path());
                StorageBackend::File(store)
            }
        };
        let backend = Arc::new(backend);
        let keys = StorageKeys::with_prefix(&settings.keys.prefix);

        let preferences_store = PreferencesStore::new(backend.clone(), keys.user_preferences.clone());
        let account_store = AccountStore::new(backend, keys);

        Ok(Self {
            account_store,
            preferences_store,
        })
    }
}
