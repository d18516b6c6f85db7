use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Login metrics
    pub login_requests: IntCounter,
    pub login_failures: IntCounterVec,
    pub login_duration: Histogram,

    // Token metrics
    pub token_expiry_unix: IntGauge,
    pub token_store_failures: IntCounterVec,

    // Lookup metrics
    pub order_fetches: IntCounterVec,
    pub order_fetch_duration: HistogramVec,
    pub retry_passes: IntCounter,
    pub batches: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

// metric definitions are static; a failure here is a programming error
const DEFINITION: &str = "static metric definition";

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("greenform".into()), None).expect(DEFINITION);

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Login
            login_requests: IntCounter::new("login_requests_total", "Login attempts sent to the remote").expect(DEFINITION),
            login_failures: IntCounterVec::new(Opts::new("login_failures_total", "Login failures by reason"), &["reason"]).expect(DEFINITION),
            login_duration: Histogram::with_opts(HistogramOpts::new("login_duration_seconds", "Login duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])).expect(DEFINITION),

            // Token
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the current token").expect(DEFINITION),
            token_store_failures: IntCounterVec::new(Opts::new("token_store_failures_total", "Token store failures by operation"), &["operation"]).expect(DEFINITION),

            // Lookup
            order_fetches: IntCounterVec::new(Opts::new("order_fetches_total", "Order lookups by pass and outcome"), &["phase", "outcome"]).expect(DEFINITION),
            order_fetch_duration: HistogramVec::new(HistogramOpts::new("order_fetch_duration_seconds", "Order lookup duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0]), &["phase"]).expect(DEFINITION),
            retry_passes: IntCounter::new("retry_passes_total", "Batches that needed an auth-failure retry pass").expect(DEFINITION),
            batches: IntCounterVec::new(Opts::new("batches_total", "Batches by result"), &["result"]).expect(DEFINITION),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").expect(DEFINITION),
            up: IntGauge::new("up", "1 if service is healthy").expect(DEFINITION),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.login_requests.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.login_failures.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.login_duration.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.token_expiry_unix.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.token_store_failures.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.order_fetches.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.order_fetch_duration.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.retry_passes.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.batches.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.config_validation_errors.clone())).expect(DEFINITION);
        reg.register(Box::new(metrics.up.clone())).expect(DEFINITION);

        metrics
    }
}
