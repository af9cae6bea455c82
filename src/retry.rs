//! Retry-on-not-found with exponential backoff
//!
//! Covers read-after-write races: an entity referenced milliseconds after it
//! was created may not yet be visible to the read path. Only
//! [`ErrorKind::NotFound`](crate::error::ErrorKind::NotFound) is retried; any
//! other error is returned on the spot.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cancel::{CancelToken, sleep_or_cancel};
use crate::clock::Clock;
use crate::error::LedgerError;

/// Attempts used when none are configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Hard ceiling on attempts. `base * 2^29` still fits a `Duration`.
pub const MAX_ATTEMPTS_CEILING: u32 = 30;

/// Backoff base used when none is configured
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(100);

/// Raw retry settings as they appear in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub base_backoff_ms: Option<u64>,
}

/// Sanitized retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy, substituting defaults for unset or zero values and
    /// clamping attempts to [`MAX_ATTEMPTS_CEILING`].
    pub fn new(max_attempts: Option<u32>, base_backoff: Option<Duration>) -> Self {
        let max_attempts = match max_attempts {
            Some(n) if n > 0 => n.min(MAX_ATTEMPTS_CEILING),
            _ => DEFAULT_MAX_ATTEMPTS,
        };
        let base_backoff = match base_backoff {
            Some(d) if !d.is_zero() => d,
            _ => DEFAULT_BASE_BACKOFF,
        };
        Self {
            max_attempts,
            base_backoff,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.base_backoff_ms.map(Duration::from_millis),
        )
    }

    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[inline]
    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Delay after the 0-indexed `attempt` failed: `base * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_ATTEMPTS_CEILING - 1);
        self.base_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Run `op` until it succeeds, fails with a non-not-found error, exhausts
/// the policy, or `cancel` fires during a backoff wait.
///
/// The final error is returned verbatim.
pub async fn retry_on_not_found<T, F, Fut>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancelToken,
    what: &str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;
    loop {
        let err = match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(lookup = what, attempts = attempt + 1, "Lookup succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_not_found() {
            return Err(err);
        }

        if attempt + 1 >= policy.max_attempts() {
            warn!(
                lookup = what,
                attempts = attempt + 1,
                error = %err,
                "Lookup still not found after final attempt"
            );
            return Err(err);
        }

        let delay = policy.backoff(attempt);
        debug!(
            lookup = what,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Not found, backing off before retry"
        );
        sleep_or_cancel(clock, cancel, delay).await?;
        attempt += 1;
    }
}
