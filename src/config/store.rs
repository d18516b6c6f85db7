use serde::Deserialize;
use std::path::PathBuf;

use crate::utils::constants::DEFAULT_STORE_KEY;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Memory,
    File,
}

/// Token persistence block
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// required for `file`
    pub path: Option<PathBuf>,
    #[serde(default = "default_store_key")]
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::Memory,
            path: None,
            key: default_store_key(),
        }
    }
}

fn default_store_key() -> String {
    DEFAULT_STORE_KEY.to_string()
}
