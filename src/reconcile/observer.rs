//! Reconcile run observation
//!
//! The reconciler reports every guardrail decision as a [`ReconcileEvent`]
//! instead of only logging it, so tests can assert on breaker trips and cap
//! hits directly.

use tracing::{debug, error, info, warn};

use super::status::BalanceStatus;
use super::types::RunStats;
use crate::core_types::{OrganizationId, TransactionId};
use crate::error::LedgerError;
use crate::logging::TRACE_TARGET;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    RunStarted {
        candidates: usize,
    },
    Resolved {
        transaction_id: TransactionId,
        organization_id: OrganizationId,
        status: BalanceStatus,
    },
    /// Another writer moved the row out of PENDING first
    AlreadyTerminal {
        transaction_id: TransactionId,
        organization_id: OrganizationId,
    },
    UpdateFailed {
        transaction_id: TransactionId,
        organization_id: OrganizationId,
        error: LedgerError,
    },
    /// First skip of an organization in this run
    OrgCapReached {
        organization_id: OrganizationId,
        limit: usize,
    },
    TotalCapReached {
        processed: usize,
    },
    BreakerTripped {
        processed: usize,
        errors: usize,
        error_rate: f64,
    },
    RunFinished {
        stats: RunStats,
    },
}

pub trait ReconcileObserver: Send + Sync {
    fn on_event(&self, event: &ReconcileEvent);
}

/// Production observer: structured logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::RunStarted { candidates } => {
                info!(candidates, "Reconcile run started");
            }
            ReconcileEvent::Resolved {
                transaction_id,
                organization_id,
                status,
            } => {
                debug!(
                    target: TRACE_TARGET,
                    transaction_id = %transaction_id,
                    organization_id = %organization_id,
                    status = %status,
                    "Transaction reconciled"
                );
            }
            ReconcileEvent::AlreadyTerminal {
                transaction_id,
                organization_id,
            } => {
                debug!(
                    transaction_id = %transaction_id,
                    organization_id = %organization_id,
                    "Transaction no longer PENDING, left as is"
                );
            }
            ReconcileEvent::UpdateFailed {
                transaction_id,
                organization_id,
                error,
            } => {
                error!(
                    transaction_id = %transaction_id,
                    organization_id = %organization_id,
                    error = %error,
                    "Failed to update balance status"
                );
            }
            ReconcileEvent::OrgCapReached {
                organization_id,
                limit,
            } => {
                warn!(
                    organization_id = %organization_id,
                    limit,
                    "Per-organization cap reached, deferring remaining transactions"
                );
            }
            ReconcileEvent::TotalCapReached { processed } => {
                info!(processed, "Per-run cap reached, stopping");
            }
            ReconcileEvent::BreakerTripped {
                processed,
                errors,
                error_rate,
            } => {
                error!(
                    processed,
                    errors,
                    error_rate,
                    "Circuit breaker tripped, aborting reconcile run"
                );
            }
            ReconcileEvent::RunFinished { stats } => {
                info!(
                    candidates = stats.candidates,
                    processed = stats.processed,
                    confirmed = stats.confirmed,
                    failed = stats.failed,
                    errors = stats.errors,
                    already_terminal = stats.already_terminal,
                    skipped = stats.skipped,
                    stop_reason = %stats.stop_reason,
                    "Reconcile run finished"
                );
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every event for later assertions
    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<ReconcileEvent>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<ReconcileEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn breaker_trips(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, ReconcileEvent::BreakerTripped { .. }))
                .count()
        }

        pub fn org_caps(&self) -> Vec<OrganizationId> {
            self.events()
                .iter()
                .filter_map(|e| match e {
                    ReconcileEvent::OrgCapReached {
                        organization_id, ..
                    } => Some(*organization_id),
                    _ => None,
                })
                .collect()
        }
    }

    impl ReconcileObserver for RecordingObserver {
        fn on_event(&self, event: &ReconcileEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
pub use mock::RecordingObserver;
