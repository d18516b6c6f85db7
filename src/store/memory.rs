use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StoreError;
use crate::helpers::time::now;
use crate::store::token_store::{StoredEntry, TokenStore};

/// Process-local store. Default when nothing is configured, and the fake used
/// by tests.
#[derive(Debug, Clone)]
pub struct InMemoryTokenStore {
    inner: Arc<RwLock<HashMap<String, StoredEntry>>>,
    safety_margin: TimeDelta,
}

impl InMemoryTokenStore {
    pub fn new(safety_margin: TimeDelta) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            safety_margin,
        }
    }

    /// Raw entry, ignoring the safety margin
    pub async fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.inner.read().await.get(key).cloned()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().await;
        Ok(map
            .get(key)
            .filter(|entry| {
                let fresh = entry.is_fresh(now(), self.safety_margin);
                if !fresh {
                    debug!(key, "stored token inside safety margin, treated as absent");
                }
                fresh
            })
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.insert(key.to_owned(), StoredEntry::new(value, expires_at));
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.inner.write().await.remove(key);
        Ok(())
    }
}
