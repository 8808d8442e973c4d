use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

use super::{KeyValueStore, StorageError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `database_url`, creating the file and its parent
    /// directories when missing, and makes sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        create_database_file(database_url).await?;

        let pool = SqlitePoolOptions::new().connect(database_url).await?;
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Creates the key-value table if it doesn't exist
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// sqlx refuses to open a missing file unless told to create it, so the
/// store file is created up front. In-memory urls have nothing to create.
async fn create_database_file(database_url: &str) -> std::io::Result<()> {
    let path = Path::new(database_url.trim_start_matches("sqlite:"));
    if path.as_os_str() == ":memory:" || path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;

    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM kv_store
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let value = row.map(|row| row.try_get::<String, _>("value")).transpose()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn multi_remove(&self, keys: Vec<String>) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for key in keys {
            sqlx::query(
                r#"
                DELETE FROM kv_store
                WHERE key = ?
                "#,
            )
            .bind(key)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory SQLite");

        let store = SqliteStore::new(pool);
        store.init().await.expect("Failed to initialize database");
        store
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_value() {
        let store = create_test_store().await;

        store
            .set("key", "first".to_string())
            .await
            .expect("Failed to set value");
        store
            .set("key", "second".to_string())
            .await
            .expect("Failed to overwrite value");

        let value = store.get("key").await.expect("Failed to get value");
        assert_eq!(value.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = create_test_store().await;

        let value = store.get("missing").await.expect("Failed to get value");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_multi_remove_deletes_all_given_keys() {
        let store = create_test_store().await;

        for key in ["a", "b", "c"] {
            store
                .set(key, format!("value-{key}"))
                .await
                .expect("Failed to set value");
        }

        store
            .multi_remove(vec!["a".to_string(), "c".to_string(), "zzz".to_string()])
            .await
            .expect("Failed to remove keys");

        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("value-b"));
    }

    #[tokio::test]
    async fn test_connect_creates_missing_database_file() {
        let dir = std::env::temp_dir().join(format!("swipe-account-store-{}", uuid::Uuid::new_v4()));
        let db_path = dir.join("nested").join("accounts.db");

        let store = SqliteStore::connect(&format!("sqlite:{}", db_path.display()))
            .await
            .expect("Failed to open database");
        store
            .set("key", "value".to_string())
            .await
            .expect("Failed to set value");

        assert!(db_path.exists());
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
