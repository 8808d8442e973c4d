use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AccountStoreError {
    #[error("Account storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StorageError> for AccountStoreError {
    fn from(err: StorageError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AccountStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("malformed account data: {err}"))
    }
}
