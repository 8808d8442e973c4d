use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{KeyValueStore, StorageError};

/// Key-value store persisted as a single JSON object file.
///
/// Every write rewrites the whole file through a temp file that is synced and
/// then renamed over the original, so readers see either the old or the new
/// contents and never a partial write.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        let temp_path = self.temp_path();

        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("wrote {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.json".to_string());

        self.path.with_file_name(format!(
            "{file_name}.tmp.{}.{}",
            std::process::id(),
            Uuid::new_v4().simple()
        ))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.read_entries().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value);
        self.write_entries(&entries).await
    }

    async fn multi_remove(&self, keys: Vec<String>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries().await?;
        let original_len = entries.len();
        for key in &keys {
            entries.remove(key);
        }

        if entries.len() == original_len {
            return Ok(());
        }
        self.write_entries(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("swipe-account-store-{}", Uuid::new_v4()))
            .join("store.json")
    }

    #[tokio::test]
    async fn test_values_survive_reopening_the_file() {
        let path = temp_store_path();

        let store = FileStore::new(&path);
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        drop(store);

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").await.unwrap().as_deref(), Some("2"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let store = FileStore::new(temp_store_path());

        assert!(store.get("anything").await.unwrap().is_none());
        store
            .multi_remove(vec!["anything".to_string()])
            .await
            .unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_multi_remove_rewrites_remaining_entries() {
        let path = temp_store_path();
        let store = FileStore::new(&path);
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();

        store.multi_remove(vec!["a".to_string()]).await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
        let temp_leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(temp_leftovers, 0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_file_is_reported_as_error() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        let result = store.get("a").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_each_write_gets_its_own_temp_file() {
        let store = FileStore::new(temp_store_path());

        assert_ne!(store.temp_path(), store.temp_path());
        assert_eq!(store.temp_path().parent(), store.path().parent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stores_sharing_a_file_write_concurrently() {
        let path = temp_store_path();
        let first = Arc::new(FileStore::new(&path));
        let second = Arc::new(FileStore::new(&path));

        let mut tasks = tokio::task::JoinSet::new();
        for idx in 0..10 {
            for store in [first.clone(), second.clone()] {
                tasks.spawn(async move { store.set("shared", format!("value-{idx}")).await });
            }
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        let value = first.get("shared").await.unwrap().unwrap();
        assert!(value.starts_with("value-"));
        let temp_leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(temp_leftovers, 0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
