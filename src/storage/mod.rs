pub mod file;
pub mod inmemory;
pub mod sqlite;

use async_trait::async_trait;

pub static DEFAULT_KEY_PREFIX: &str = "@swipe_app";

/// Names of the entries the stores persist under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub saved_accounts: String,
    pub current_account: String,
    pub user_preferences: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            saved_accounts: format!("{prefix}_saved_accounts"),
            current_account: format!("{prefix}_current_account"),
            user_preferences: format!("{prefix}_user_preferences"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage operation failed: {0}")]
    OperationFailed(String),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Asynchronous string key-value storage the account and preference stores
/// persist into.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removes all given keys in one operation. Missing keys are ignored.
    async fn multi_remove(&self, keys: Vec<String>) -> Result<(), StorageError>;
}
