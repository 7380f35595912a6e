//! # Offline sync worker
//!
//! Reconciles the local delivery queues against the quoting backend:
//!
//! - pushes `pending` (and retry-due `failed`) quick quotes and PDF
//!   deliveries, moving them through `sending` to `sent`/`failed`
//! - pulls the backend's existence list to detect quotes deleted
//!   server-side and drops the matching local rows
//! - pushes local `deleted` tombstones as backend deletions, then
//!   hard-deletes them once confirmed
//!
//! Passes run on a fixed interval while the worker is started and can be
//! triggered on demand via [`SyncWorker::run_pass`]. Failed items retry
//! with exponential backoff (`base * 2^(retry_count - 1)`, capped) up to
//! a configured attempt bound, after which they stay `failed` for manual
//! attention.
//!
//! A pass over a converged store performs exactly one remote call (the
//! existence-list fetch) and no remote mutations: `sent` items and
//! removed tombstones are never pushed again.

mod error;
mod rates;
mod worker;

pub use error::{SyncError, SyncResult};
pub use rates::{RateStoreUpdater, RATE_DB_VERSION_KEY};
pub use worker::{PassSummary, SyncHandle, SyncWorker};

use std::time::Duration;

/// Sync pacing and retry configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often a pass runs while the worker is started.
    pub interval: Duration,
    /// Base delay for exponential retry backoff.
    pub backoff_base: Duration,
    /// Cap on the retry backoff.
    pub backoff_max: Duration,
    /// Attempts after which a failed item is left for manual attention.
    pub max_send_retries: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(300),
            max_send_retries: 8,
        }
    }
}

/// Exponential backoff in whole seconds: `base * 2^(retry_count - 1)`,
/// capped at the configured maximum.
fn compute_backoff_secs(retry_count: i64, config: &SyncConfig) -> i64 {
    if retry_count <= 0 {
        return 0;
    }
    let base = config.backoff_base.as_secs();
    let max = config.backoff_max.as_secs();
    let shift = (retry_count - 1).min(62) as u32;
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    base.saturating_mul(multiplier).min(max) as i64
}

/// Whether an item's backoff window has elapsed. `updated_at` doubles as
/// the last-attempt timestamp because every attempt rewrites the status.
pub(crate) fn is_item_due(
    last_attempt_unix: i64,
    retry_count: i64,
    now_unix: i64,
    config: &SyncConfig,
) -> bool {
    now_unix >= last_attempt_unix + compute_backoff_secs(retry_count, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: u64, max: u64) -> SyncConfig {
        SyncConfig {
            backoff_base: Duration::from_secs(base),
            backoff_max: Duration::from_secs(max),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = config(2, 10);
        assert_eq!(compute_backoff_secs(0, &config), 0);
        assert_eq!(compute_backoff_secs(1, &config), 2);
        assert_eq!(compute_backoff_secs(2, &config), 4);
        assert_eq!(compute_backoff_secs(3, &config), 8);
        assert_eq!(compute_backoff_secs(4, &config), 10);
        assert_eq!(compute_backoff_secs(50, &config), 10);
    }

    #[test]
    fn test_backoff_zero_for_non_positive_retries() {
        let config = config(2, 300);
        assert_eq!(compute_backoff_secs(0, &config), 0);
        assert_eq!(compute_backoff_secs(-1, &config), 0);
    }

    #[test]
    fn test_backoff_huge_retry_count_saturates() {
        let config = config(2, 300);
        assert_eq!(compute_backoff_secs(100, &config), 300);
        assert_eq!(compute_backoff_secs(i64::MAX, &config), 300);
    }

    #[test]
    fn test_is_item_due_boundaries() {
        let config = config(2, 300);
        let now = 1_700_000_000;

        // retry_count 0 is always due, even if just attempted
        assert!(is_item_due(now, 0, now, &config));

        // retry_count 1 waits out the 2s base
        assert!(!is_item_due(now, 1, now, &config));
        assert!(!is_item_due(now, 1, now + 1, &config));
        assert!(is_item_due(now, 1, now + 2, &config));
        assert!(is_item_due(now, 1, now + 3, &config));
    }
}
