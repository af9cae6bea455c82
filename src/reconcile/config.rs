//! Reconciler guardrail configuration
//!
//! [`ReconcilerSettings`] is what operators write in YAML: every field is
//! optional and may be nonsense. [`ReconcilerConfig`] is what the reconciler
//! runs with: each field replaced by its default when unset or invalid.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// 24h retry window + 1h buffer
pub const DEFAULT_THRESHOLD_AGE: Duration = Duration::from_secs(25 * 3600);
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_TOTAL_PER_RUN: usize = 500;
pub const DEFAULT_MAX_PER_ORG_PER_RUN: usize = 200;
pub const DEFAULT_MAX_ERROR_RATE: f64 = 0.3;
pub const DEFAULT_MIN_PROCESSED_FOR_RATE_CHECK: usize = 10;
pub const DEFAULT_SLEEP_BETWEEN_MIN: Duration = Duration::from_millis(50);
pub const DEFAULT_SLEEP_JITTER: Duration = Duration::from_millis(50);
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Raw reconciler settings as they appear in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    #[serde(default)]
    pub threshold_age_secs: Option<i64>,
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub max_total_per_run: Option<i64>,
    #[serde(default)]
    pub max_per_org_per_run: Option<i64>,
    #[serde(default)]
    pub max_error_rate: Option<f64>,
    #[serde(default)]
    pub min_processed_for_rate_check: Option<i64>,
    #[serde(default)]
    pub sleep_between_min_ms: Option<i64>,
    #[serde(default)]
    pub sleep_jitter_ms: Option<i64>,
    #[serde(default)]
    pub scan_interval_secs: Option<i64>,
    /// `0` disables the per-run deadline
    #[serde(default)]
    pub run_timeout_secs: Option<i64>,
}

/// Sanitized configuration for the pending-transaction reconciler
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Minimum age before a PENDING transaction is eligible
    pub threshold_age: Duration,
    /// Candidates fetched per run
    pub batch_size: usize,
    /// Hard cap on transactions processed per run
    pub max_total_per_run: usize,
    /// Fairness cap per organization per run
    pub max_per_org_per_run: usize,
    /// Circuit breaker threshold, in (0, 1]
    pub max_error_rate: f64,
    /// Breaker stays closed until more than this many were processed
    pub min_processed_for_rate_check: usize,
    pub sleep_between_min: Duration,
    pub sleep_jitter: Duration,
    /// Worker tick
    pub scan_interval: Duration,
    /// Per-run deadline; `None` runs unbounded
    pub run_timeout: Option<Duration>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            threshold_age: DEFAULT_THRESHOLD_AGE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_total_per_run: DEFAULT_MAX_TOTAL_PER_RUN,
            max_per_org_per_run: DEFAULT_MAX_PER_ORG_PER_RUN,
            max_error_rate: DEFAULT_MAX_ERROR_RATE,
            min_processed_for_rate_check: DEFAULT_MIN_PROCESSED_FOR_RATE_CHECK,
            sleep_between_min: DEFAULT_SLEEP_BETWEEN_MIN,
            sleep_jitter: DEFAULT_SLEEP_JITTER,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            run_timeout: Some(DEFAULT_RUN_TIMEOUT),
        }
    }
}

fn positive(name: &str, value: Option<i64>, default: usize) -> usize {
    match value {
        None => default,
        Some(v) if v > 0 => v as usize,
        Some(v) => {
            warn!(option = name, value = v, default, "Invalid reconciler option, using default");
            default
        }
    }
}

fn non_negative(name: &str, value: Option<i64>, default: u64) -> u64 {
    match value {
        None => default,
        Some(v) if v >= 0 => v as u64,
        Some(v) => {
            warn!(option = name, value = v, default, "Invalid reconciler option, using default");
            default
        }
    }
}

impl ReconcilerConfig {
    pub fn from_settings(s: &ReconcilerSettings) -> Self {
        let d = Self::default();

        let max_error_rate = match s.max_error_rate {
            None => d.max_error_rate,
            Some(r) if r.is_finite() && r > 0.0 && r <= 1.0 => r,
            Some(r) => {
                warn!(
                    option = "max_error_rate",
                    value = r,
                    default = d.max_error_rate,
                    "Invalid reconciler option, using default"
                );
                d.max_error_rate
            }
        };

        let run_timeout = match s.run_timeout_secs {
            None => d.run_timeout,
            Some(0) => None,
            Some(v) if v > 0 => Some(Duration::from_secs(v as u64)),
            Some(v) => {
                warn!(
                    option = "run_timeout_secs",
                    value = v,
                    "Invalid reconciler option, using default"
                );
                d.run_timeout
            }
        };

        Self {
            threshold_age: Duration::from_secs(positive(
                "threshold_age_secs",
                s.threshold_age_secs,
                d.threshold_age.as_secs() as usize,
            ) as u64),
            batch_size: positive("batch_size", s.batch_size, d.batch_size),
            max_total_per_run: positive("max_total_per_run", s.max_total_per_run, d.max_total_per_run),
            max_per_org_per_run: positive(
                "max_per_org_per_run",
                s.max_per_org_per_run,
                d.max_per_org_per_run,
            ),
            max_error_rate,
            min_processed_for_rate_check: non_negative(
                "min_processed_for_rate_check",
                s.min_processed_for_rate_check,
                d.min_processed_for_rate_check as u64,
            ) as usize,
            sleep_between_min: Duration::from_millis(non_negative(
                "sleep_between_min_ms",
                s.sleep_between_min_ms,
                d.sleep_between_min.as_millis() as u64,
            )),
            sleep_jitter: Duration::from_millis(non_negative(
                "sleep_jitter_ms",
                s.sleep_jitter_ms,
                d.sleep_jitter.as_millis() as u64,
            )),
            scan_interval: Duration::from_secs(positive(
                "scan_interval_secs",
                s.scan_interval_secs,
                d.scan_interval.as_secs() as usize,
            ) as u64),
            run_timeout,
        }
    }
}
