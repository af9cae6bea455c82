//! Pending-Transaction Reconciler
//!
//! Moves PENDING transactions older than the retry window to a terminal
//! balance status. The outcome is proven by `balance_persisted_at`, never
//! guessed from age:
//!
//! | `balance_persisted_at` | result    |
//! |------------------------|-----------|
//! | set                    | CONFIRMED |
//! | null                   | FAILED    |
//!
//! A run is bounded by guardrails: a total cap, a per-organization cap, and
//! an error-rate circuit breaker. Candidates are handled one at a time with a
//! jittered, cancellable pause between updates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::config::ReconcilerConfig;
use super::observer::{ReconcileEvent, ReconcileObserver};
use super::repository::TransactionRepository;
use super::status::BalanceStatus;
use super::types::{PendingTransaction, RunStats, StopReason};
use crate::cancel::{CancelToken, sleep_or_cancel};
use crate::clock::Clock;
use crate::error::LedgerError;

pub struct PendingReconciler {
    repo: Arc<dyn TransactionRepository>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ReconcileObserver>,
    config: ReconcilerConfig,
}

impl PendingReconciler {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn ReconcileObserver>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run once with a freshly seeded jitter source
    pub async fn run(&self, cancel: &CancelToken) -> Result<RunStats, LedgerError> {
        let mut rng = StdRng::from_entropy();
        self.run_with_rng(cancel, &mut rng).await
    }

    /// Run once, drawing pacing jitter from `rng`.
    ///
    /// # Errors
    /// - the repository error when candidates cannot be fetched
    /// - `Canceled` when `cancel` fires; updates already applied are kept
    ///
    /// Failed status updates and a tripped breaker are reported through
    /// [`RunStats`], not as errors.
    pub async fn run_with_rng<R: Rng + Send>(
        &self,
        cancel: &CancelToken,
        rng: &mut R,
    ) -> Result<RunStats, LedgerError> {
        let candidates = self.fetch_candidates(cancel).await?;
        let mut stats = RunStats::new(candidates.len());

        if candidates.is_empty() {
            debug!("No pending transactions to reconcile");
            return Ok(stats);
        }

        self.observer.on_event(&ReconcileEvent::RunStarted {
            candidates: candidates.len(),
        });

        let mut capped_orgs = HashSet::new();

        for tx in &candidates {
            if stats.processed >= self.config.max_total_per_run {
                stats.stop_reason = StopReason::TotalCapReached;
                self.observer.on_event(&ReconcileEvent::TotalCapReached {
                    processed: stats.processed,
                });
                break;
            }

            if let Err(e) = cancel.check() {
                warn!(processed = stats.processed, error = %e, "Reconcile run cancelled");
                return Err(e);
            }

            if stats.org_count(&tx.organization_id) >= self.config.max_per_org_per_run {
                stats.skipped += 1;
                if capped_orgs.insert(tx.organization_id) {
                    self.observer.on_event(&ReconcileEvent::OrgCapReached {
                        organization_id: tx.organization_id,
                        limit: self.config.max_per_org_per_run,
                    });
                }
                continue;
            }

            if let Err(e) = self.pace(cancel, rng).await {
                warn!(processed = stats.processed, error = %e, "Reconcile run cancelled");
                return Err(e);
            }

            self.resolve_one(tx, &mut stats).await;

            stats.processed += 1;
            *stats.per_org.entry(tx.organization_id).or_insert(0) += 1;

            if self.breaker_open(&stats) {
                stats.stop_reason = StopReason::BreakerTripped;
                self.observer.on_event(&ReconcileEvent::BreakerTripped {
                    processed: stats.processed,
                    errors: stats.errors,
                    error_rate: stats.error_rate(),
                });
                break;
            }
        }

        self.observer.on_event(&ReconcileEvent::RunFinished {
            stats: stats.clone(),
        });
        Ok(stats)
    }

    async fn fetch_candidates(
        &self,
        cancel: &CancelToken,
    ) -> Result<Vec<PendingTransaction>, LedgerError> {
        tokio::select! {
            biased;
            cause = cancel.cancelled() => Err(LedgerError::Canceled(cause)),
            found = self.repo.find_pending_for_reconciliation(
                self.config.threshold_age,
                self.config.batch_size,
            ) => found,
        }
    }

    async fn pace<R: Rng + Send>(
        &self,
        cancel: &CancelToken,
        rng: &mut R,
    ) -> Result<(), LedgerError> {
        let jitter_ms = self.config.sleep_jitter.as_millis() as u64;
        let extra = Duration::from_millis(rng.gen_range(0..=jitter_ms));
        sleep_or_cancel(
            self.clock.as_ref(),
            cancel,
            self.config.sleep_between_min + extra,
        )
        .await
    }

    /// Apply the proof rule to one candidate; errors only count
    async fn resolve_one(&self, tx: &PendingTransaction, stats: &mut RunStats) {
        let status = tx.resolved_status();

        match self
            .repo
            .update_balance_status(tx.organization_id, tx.ledger_id, tx.id, status)
            .await
        {
            Ok(true) => {
                match status {
                    BalanceStatus::Confirmed => stats.confirmed += 1,
                    _ => stats.failed += 1,
                }
                self.observer.on_event(&ReconcileEvent::Resolved {
                    transaction_id: tx.id,
                    organization_id: tx.organization_id,
                    status,
                });
            }
            Ok(false) => {
                stats.already_terminal += 1;
                self.observer.on_event(&ReconcileEvent::AlreadyTerminal {
                    transaction_id: tx.id,
                    organization_id: tx.organization_id,
                });
            }
            Err(error) => {
                stats.errors += 1;
                self.observer.on_event(&ReconcileEvent::UpdateFailed {
                    transaction_id: tx.id,
                    organization_id: tx.organization_id,
                    error,
                });
            }
        }
    }

    fn breaker_open(&self, stats: &RunStats) -> bool {
        stats.processed > self.config.min_processed_for_rate_check
            && stats.error_rate() > self.config.max_error_rate
    }
}
