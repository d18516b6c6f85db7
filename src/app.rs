use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::manager::{TokenLifecycleManager, TokenPolicy};
use crate::config::service::ServiceConfig;
use crate::fetch::orchestrator::{FetchOrchestrator, FetchSettings};
use crate::helpers::time::seconds;
use crate::remote::login::HttpAuthenticator;
use crate::remote::order::HttpOrderClient;
use crate::remote::build_client;
use crate::store::build_token_store;

/// Wire the HTTP remote, the token store and the token lifecycle into an
/// orchestrator, restoring a persisted token when one is still usable.
pub async fn build_orchestrator(config: &ServiceConfig) -> Result<FetchOrchestrator> {
    let settings = &config.settings;
    let client = build_client(Duration::from_millis(settings.fetch.request_timeout_ms))
        .map_err(|e| anyhow!("cannot build http client: {}", e))?;

    let authenticator = Arc::new(HttpAuthenticator::new(client.clone(), &config.remote));
    let lookup = Arc::new(HttpOrderClient::new(client, &config.remote));
    let store = build_token_store(&config.store, seconds(settings.token.safety_margin_seconds));
    let credential = config.credential.resolve()?;

    let tokens = TokenLifecycleManager::new(
        authenticator,
        store,
        credential,
        TokenPolicy::new(&settings.token, config.store.key.as_str()),
    );
    if tokens.hydrate().await.is_none() {
        info!("no usable stored token, first batch will log in");
    }

    Ok(FetchOrchestrator::new(tokens, lookup, FetchSettings::from(&settings.fetch)))
}
