use anyhow::{anyhow, Result};
use axum::Router;
use tracing::{info, warn};

use crate::config::settings::SettingsConfig;
use crate::fetch::orchestrator::FetchOrchestrator;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::lookup::LookupState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub lookup_state: LookupState,
}

impl AppState {
    pub fn new(metrics: &Metrics, orchestrator: FetchOrchestrator) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            lookup_state: LookupState::new(orchestrator),
        }
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(state.lookup_state.router())
        .with_state(state)
}

/// Serve lookups, progress and metrics until the process is stopped.
pub async fn start(settings_config: &SettingsConfig, orchestrator: FetchOrchestrator) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(metrics, orchestrator));

    let (host, port) = settings_config
        .server
        .as_ref()
        .map(|server| (server.host.as_str(), server.port.as_str()))
        .ok_or_else(|| anyhow!("serve mode needs settings.server"))?;

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .map_err(|e| anyhow!("cannot bind {}:{}: {}", host, port, e))?;
    info!(address = host, port, "server listening");
    metrics.up.set(1);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    metrics.up.set(0);
    served.map_err(|e| anyhow!("server failed: {}", e))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!("cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
