use serde::Serialize;

use crate::orders::outcome::FetchOutcome;

static NO_OUTCOME_MSG: &str = "no outcome recorded";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkEntry {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(flatten)]
    pub outcome: FetchOutcome,
}

/// Batch-level notice that does not abort the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAdvisory {
    /// every identifier failed
    AllFailed,
}

/// One batch, in parsed input order, one entry per identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BulkResult {
    pub entries: Vec<BulkEntry>,
    pub success_count: usize,
    pub failure_count: usize,
    /// identifiers sent through the retry pass
    pub retried: usize,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<BatchAdvisory>,
}

impl BulkResult {
    pub fn outcome(&self, order_id: &str) -> Option<&FetchOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.order_id == order_id)
            .map(|entry| &entry.outcome)
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| !entry.outcome.is_success())
            .map(|entry| entry.order_id.as_str())
            .collect()
    }
}

/// Merge first-pass and retry outcomes into the final result.
///
/// Outcomes are keyed by index into `ids`, so duplicated identifier values
/// cannot overwrite each other. A retry outcome replaces the first-pass one at
/// the same index. An index with no outcome at all becomes a network error
/// rather than disappearing; out-of-range indices are ignored.
pub fn merge(
    ids: &[String],
    first_pass: Vec<(usize, FetchOutcome)>,
    retry: Option<Vec<(usize, FetchOutcome)>>,
) -> BulkResult {
    let mut slots: Vec<Option<FetchOutcome>> = vec![None; ids.len()];
    for (index, outcome) in first_pass {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    let mut retried = 0;
    for (index, outcome) in retry.into_iter().flatten() {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
            retried += 1;
        }
    }

    let entries: Vec<BulkEntry> = ids
        .iter()
        .zip(slots)
        .map(|(order_id, outcome)| BulkEntry {
            order_id: order_id.clone(),
            outcome: outcome.unwrap_or_else(|| FetchOutcome::network_error(NO_OUTCOME_MSG)),
        })
        .collect();

    let success_count = entries.iter().filter(|entry| entry.outcome.is_success()).count();
    let failure_count = entries.len() - success_count;
    let advisory = (!entries.is_empty() && success_count == 0).then_some(BatchAdvisory::AllFailed);

    BulkResult {
        progress_percent: if entries.is_empty() { 0 } else { 100 },
        entries,
        success_count,
        failure_count,
        retried,
        advisory,
    }
}
