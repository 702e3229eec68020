//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for `created_at`, `last_run_at`, fire instants, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Wall-clock distance from `from` to `target`, zero when `target` is not
/// in the future.
#[must_use]
pub fn between(from: Timestamp, target: Timestamp) -> Duration {
    (target - from).to_std().unwrap_or(Duration::ZERO)
}
