use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::auth::manager::TokenLifecycleManager;
use crate::auth::token::Token;
use crate::config::settings::FetchConfig;
use crate::errors::BatchError;
use crate::fetch::aggregator::{merge, BatchAdvisory, BulkResult};
use crate::fetch::progress::{Phase, ProgressReporter};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::orders::outcome::FetchOutcome;
use crate::orders::parse::parse_order_ids;
use crate::remote::OrderLookup;

static DEADLINE_MSG: &str = "batch deadline exceeded";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_concurrency: usize,
    pub batch_deadline: Duration,
}

impl From<&FetchConfig> for FetchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            batch_deadline: Duration::from_millis(config.batch_deadline_ms),
        }
    }
}

/// Runs batches: one lookup per identifier, bounded fan-out, then one retry
/// pass for identifiers whose token was rejected.
///
/// Clones share the token lifecycle and the progress channel. Batches run one
/// at a time so the published progress always belongs to a single batch.
#[derive(Clone)]
pub struct FetchOrchestrator {
    tokens: TokenLifecycleManager,
    lookup: Arc<dyn OrderLookup>,
    settings: FetchSettings,
    progress: ProgressReporter,
    batch_gate: Arc<Mutex<()>>,
}

impl FetchOrchestrator {
    pub fn new(tokens: TokenLifecycleManager, lookup: Arc<dyn OrderLookup>, settings: FetchSettings) -> Self {
        Self {
            tokens,
            lookup,
            settings,
            progress: ProgressReporter::new(),
            batch_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn tokens(&self) -> &TokenLifecycleManager {
        &self.tokens
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Parse `raw_input` and fetch every identifier in it.
    ///
    /// Fails as a whole only when the input holds no identifier or no token
    /// can be obtained; in both cases nothing is fetched. Otherwise every
    /// identifier gets exactly one outcome.
    pub async fn fetch_many(&self, raw_input: &str) -> Result<BulkResult, BatchError> {
        let ids = parse_order_ids(raw_input);
        let span = info_span!("batch", size = ids.len());
        let result = {
            let _turn = self.batch_gate.lock().await;
            self.run_batch(ids).instrument(span).await
        };

        let label = match &result {
            Ok(bulk) if bulk.advisory == Some(BatchAdvisory::AllFailed) => "all_failed",
            Ok(_) => "complete",
            Err(e) => e.reason(),
        };
        get_metrics().await.batches.with_label_values(&[label]).inc();
        result
    }

    async fn run_batch(&self, ids: Vec<String>) -> Result<BulkResult, BatchError> {
        if ids.is_empty() {
            warn!("no order identifiers in input");
            return Err(BatchError::Validation);
        }
        let deadline = Instant::now() + self.settings.batch_deadline;

        let token = self.tokens.get_valid_token().await.inspect_err(|e| {
            warn!(error = %e, "no token, batch aborted before any lookup");
        })?;

        // first pass; returning from fan_out is the barrier
        self.progress.begin(ids.len());
        let first_pass = self.fan_out(&ids, (0..ids.len()).collect(), &token, deadline, Phase::FirstPass).await;

        let rejected: Vec<usize> = first_pass
            .iter()
            .filter(|(_, outcome)| outcome.is_auth_failure())
            .map(|(index, _)| *index)
            .collect();

        let retry = if rejected.is_empty() {
            None
        } else {
            self.retry_pass(&ids, rejected, deadline).await
        };

        let result = merge(&ids, first_pass, retry);
        self.progress.finish();

        info!(
            total = result.entries.len(),
            succeeded = result.success_count,
            failed = result.failure_count,
            retried = result.retried,
            "batch finished"
        );
        if result.advisory == Some(BatchAdvisory::AllFailed) {
            warn!(failed = ?result.failed_ids(), "no data found for any of the requested orders");
        } else if result.failure_count > 0 {
            debug!(failed = ?result.failed_ids(), "some orders failed");
        }
        Ok(result)
    }

    /// Force one fresh login and re-fetch exactly `rejected`. When the login
    /// itself fails the first-pass auth failures stand.
    async fn retry_pass(
        &self,
        ids: &[String],
        rejected: Vec<usize>,
        deadline: Instant,
    ) -> Option<Vec<(usize, FetchOutcome)>> {
        get_metrics().await.retry_passes.inc();
        info!(count = rejected.len(), "token rejected mid-batch, forcing a fresh login");

        let fresh = match self.tokens.login().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "re-login failed, auth failures are final");
                return None;
            }
        };

        self.progress.retry(rejected.len());
        Some(self.fan_out(ids, rejected, &fresh, deadline, Phase::Retry).await)
    }

    /// Fetch `targets` (indices into `ids`) with at most `max_concurrency` in
    /// flight. Returns once every target has settled, in completion order.
    async fn fan_out(
        &self,
        ids: &[String],
        targets: Vec<usize>,
        token: &Token,
        deadline: Instant,
        phase: Phase,
    ) -> Vec<(usize, FetchOutcome)> {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);

        // owned, so the batch future is Send for any input lifetime
        let targets: Vec<(usize, String)> = targets
            .into_iter()
            .filter_map(|index| ids.get(index).map(|id| (index, id.clone())))
            .collect();

        let mut in_flight = stream::iter(targets)
            .map(|(index, order_id): (usize, String)| async move {
                let order_id = order_id.as_str();
                let outcome = match timeout_at(deadline, self.fetch_one(order_id, token, phase)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(order_id, "lookup still pending at batch deadline");
                        FetchOutcome::network_error(DEADLINE_MSG)
                    }
                };
                (index, outcome)
            })
            .buffer_unordered(self.settings.max_concurrency);

        while let Some((index, outcome)) = in_flight.next().await {
            outcomes.push((index, outcome));
            self.progress.tick(phase, outcomes.len(), total);
        }
        outcomes
    }

    async fn fetch_one(&self, order_id: &str, token: &Token, phase: Phase) -> FetchOutcome {
        let metrics = get_metrics().await;
        let phase_label = match phase {
            Phase::Retry => "retry",
            _ => "first_pass",
        };
        let start = get_instant();

        let outcome = self.lookup.fetch_one(order_id, token).await;

        metrics
            .order_fetch_duration
            .with_label_values(&[phase_label])
            .observe(start.elapsed().as_secs_f64());
        metrics
            .order_fetches
            .with_label_values(&[phase_label, outcome.label()])
            .inc();
        if let FetchOutcome::Failure { reason, detail } = &outcome {
            debug!(order_id, reason = reason.as_str(), detail = %detail, "lookup failed");
        }
        outcome
    }
}
