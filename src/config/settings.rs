use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_BATCH_DEADLINE_MS, DEFAULT_MAX_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_VALIDITY_SECS,
};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// ================================
/// Token lifecycle
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// lifetime assumed for every issued token
    #[serde(default = "default_validity_seconds")]
    pub validity_seconds: u64,
    /// a token with this much time left or less is treated as expired
    /// invariant: < validity_seconds
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity_seconds: DEFAULT_TOKEN_VALIDITY_SECS,
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }
}

/// ================================
/// Batch fan-out
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// max lookups in flight per batch; invariant: > 0
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// per lookup request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// whole batch, first pass and retry pass together
    #[serde(default = "default_batch_deadline_ms")]
    pub batch_deadline_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            batch_deadline_ms: DEFAULT_BATCH_DEADLINE_MS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_validity_seconds() -> u64 {
    DEFAULT_TOKEN_VALIDITY_SECS
}

fn default_safety_margin_seconds() -> u64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_batch_deadline_ms() -> u64 {
    DEFAULT_BATCH_DEADLINE_MS
}
