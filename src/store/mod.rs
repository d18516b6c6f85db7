//! Token persistence adapters.

pub mod file;
pub mod memory;
pub mod token_store;

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::info;

use crate::config::store::{StoreConfig, StoreType};
use file::FileTokenStore;
use memory::InMemoryTokenStore;
use token_store::TokenStore;

/// Build the configured store. `path` presence for file stores is checked by
/// config validation; a missing path falls back to memory.
pub fn build_token_store(config: &StoreConfig, safety_margin: TimeDelta) -> Arc<dyn TokenStore> {
    match (config.store_type, config.path.as_ref()) {
        (StoreType::File, Some(path)) => {
            info!(path = %path.display(), "using file token store");
            Arc::new(FileTokenStore::new(path, safety_margin))
        }
        _ => {
            info!("using in-memory token store");
            Arc::new(InMemoryTokenStore::new(safety_margin))
        }
    }
}
