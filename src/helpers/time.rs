use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Seconds from config to a chrono delta, saturating instead of wrapping.
pub fn seconds(value: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(value).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX)
}
