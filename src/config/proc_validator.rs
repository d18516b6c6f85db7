//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks:
//!   * remote base url and endpoint paths
//!   * login candidate field lists
//!   * token validity vs safety margin
//!   * fan-out bounds and timeouts
//!   * store / logging / server invariants

use tracing::{error, info};

use crate::config::service::{RemoteConfig, ServiceConfig};
use crate::config::settings::SettingsConfig;
use crate::config::store::{StoreConfig, StoreType};
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_remote(&cfg.remote, &mut errors);
    validate_store(&cfg.store, &mut errors);

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config validation: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    let token = &settings.token;
    if token.validity_seconds == 0 {
        errors.push("settings.token.validity_seconds must be > 0".to_string());
    }
    if token.safety_margin_seconds >= token.validity_seconds {
        errors.push(format!(
            "settings.token.safety_margin_seconds ({}) must be lower than validity_seconds ({})",
            token.safety_margin_seconds, token.validity_seconds
        ));
    }

    let fetch = &settings.fetch;
    if fetch.max_concurrency == 0 {
        errors.push("settings.fetch.max_concurrency must be > 0".to_string());
    }
    if fetch.request_timeout_ms == 0 {
        errors.push("settings.fetch.request_timeout_ms must be > 0".to_string());
    }
    if fetch.batch_deadline_ms == 0 {
        errors.push("settings.fetch.batch_deadline_ms must be > 0".to_string());
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if let Some(server) = &settings.server {
        if server.host.trim().is_empty() {
            errors.push("settings.server.host must not be empty".to_string());
        }
        if server.port.parse::<u16>().is_err() {
            errors.push(format!("settings.server.port '{}' is not a valid port", server.port));
        }
    }
}

fn validate_remote(remote: &RemoteConfig, errors: &mut Vec<String>) {
    if remote.base_url.is_empty() {
        errors.push("remote.base_url must not be empty".to_string());
    } else if !(remote.base_url.starts_with("http://") || remote.base_url.starts_with("https://")) {
        errors.push(format!(
            "remote.base_url '{}' must start with http:// or https://",
            remote.base_url
        ));
    }

    let login = &remote.login;
    if login.username_field.trim().is_empty() || login.secret_field.trim().is_empty() {
        errors.push("remote.login.username_field and secret_field must not be empty".to_string());
    }
    if login.token_fields.iter().any(|f| f.trim().is_empty()) {
        errors.push("remote.login.token_fields must not contain empty names".to_string());
    }
    if login.success_fields.iter().any(|f| f.trim().is_empty()) {
        errors.push("remote.login.success_fields must not contain empty names".to_string());
    }

    let order = &remote.order;
    if order.query_param.trim().is_empty() {
        errors.push("remote.order.query_param must not be empty".to_string());
    }
    if http::HeaderName::from_bytes(order.token_header.as_bytes()).is_err() {
        errors.push(format!(
            "remote.order.token_header '{}' is not a valid header name",
            order.token_header
        ));
    }
}

fn validate_store(store: &StoreConfig, errors: &mut Vec<String>) {
    if store.key.trim().is_empty() {
        errors.push("store.key must not be empty".to_string());
    }
    if store.store_type == StoreType::File && store.path.is_none() {
        errors.push("store.path is required when store.type is 'file'".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::service::{CredentialConfig, GenericSourceValue};

    fn valid() -> ServiceConfig {
        ServiceConfig {
            settings: SettingsConfig::default(),
            remote: RemoteConfig {
                base_url: "https://orders.example.test".into(),
                login: Default::default(),
                order: Default::default(),
            },
            credential: CredentialConfig {
                username: GenericSourceValue::Literal { value: "u".into() },
                secret: GenericSourceValue::Literal { value: "s".into() },
            },
            store: StoreConfig::default(),
        }
    }

    #[tokio::test]
    async fn default_shaped_config_is_valid() {
        validate_service_config(&valid()).await.unwrap();
    }

    #[tokio::test]
    async fn every_issue_is_reported() {
        let mut cfg = valid();
        cfg.remote.base_url = "ftp://nope".into();
        cfg.remote.order.token_header = "bad header".into();
        cfg.settings.fetch.max_concurrency = 0;
        cfg.store.store_type = StoreType::File;

        let errors = validate_service_config(&cfg).await.unwrap_err();
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("base_url")));
        assert!(errors.iter().any(|e| e.contains("token_header")));
        assert!(errors.iter().any(|e| e.contains("max_concurrency")));
        assert!(errors.iter().any(|e| e.contains("store.path")));
    }
}
