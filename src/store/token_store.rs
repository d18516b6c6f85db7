use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Key-value persistence for the token blob. Implementations keep the expiry
/// next to the value and report an entry as absent once it is inside the
/// safety margin.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// Stored value plus expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, safety_margin: TimeDelta) -> bool {
        self.expires_at.signed_duration_since(now) > safety_margin
    }
}
