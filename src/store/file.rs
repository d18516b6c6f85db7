use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::helpers::time::now;
use crate::store::token_store::{StoredEntry, TokenStore};

/// JSON file holding `key -> {value, expires_at}`. Writes go to a sibling
/// `.tmp` file (mode 0600 on unix) and are renamed into place.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    safety_margin: TimeDelta,
    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, safety_margin: TimeDelta) -> Self {
        Self {
            path: path.into(),
            safety_margin,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, StoredEntry>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    // the next write replaces it
                    warn!(path = %self.path.display(), error = %e, "token store file unreadable, treating as empty");
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &HashMap<String, StoredEntry>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "token store written");
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.load().await?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_fresh(now(), self.safety_margin))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_owned(), StoredEntry::new(value, expires_at));
        self.save(&entries).await
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            info!(key, path = %self.path.display(), "token removed from store");
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("token.json");

        let store = FileTokenStore::new(&path, TimeDelta::minutes(5));
        assert_eq!(store.get("apiToken").await.unwrap(), None);

        store.set("apiToken", "blob".into(), now() + TimeDelta::hours(10)).await.unwrap();

        let reopened = FileTokenStore::new(&path, TimeDelta::minutes(5));
        assert_eq!(reopened.get("apiToken").await.unwrap().as_deref(), Some("blob"));

        reopened.clear("apiToken").await.unwrap();
        assert_eq!(store.get("apiToken").await.unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn near_expiry_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"), TimeDelta::minutes(5));
        store.set("apiToken", "blob".into(), now() + TimeDelta::minutes(5)).await.unwrap();
        assert_eq!(store.get("apiToken").await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = FileTokenStore::new(&path, TimeDelta::zero());
        store.set("apiToken", "blob".into(), now() + TimeDelta::hours(1)).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileTokenStore::new(&path, TimeDelta::zero());

        assert_eq!(store.get("apiToken").await.unwrap(), None);

        store.set("apiToken", "blob".into(), now() + TimeDelta::hours(1)).await.unwrap();
        assert_eq!(store.get("apiToken").await.unwrap().as_deref(), Some("blob"));
        let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["apiToken"]["value"], "blob");
    }
}
