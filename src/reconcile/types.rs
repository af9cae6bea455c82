//! Reconciliation Types

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::BalanceStatus;
use crate::core_types::{LedgerId, OrganizationId, TransactionId};

/// A transaction eligible for reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    pub id: TransactionId,
    pub organization_id: OrganizationId,
    pub ledger_id: LedgerId,
    pub balance_status: BalanceStatus,
    /// Set by the write path once the balance mutation is durable
    pub balance_persisted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PendingTransaction {
    /// Terminal status proven by `balance_persisted_at`.
    ///
    /// Never inferred from age or any other field.
    #[inline]
    pub fn resolved_status(&self) -> BalanceStatus {
        if self.balance_persisted_at.is_some() {
            BalanceStatus::Confirmed
        } else {
            BalanceStatus::Failed
        }
    }
}

/// Why a run stopped walking its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// Every candidate was visited
    Exhausted,
    /// `max_total_per_run` reached
    TotalCapReached,
    /// Error rate exceeded `max_error_rate`
    BreakerTripped,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Exhausted => "EXHAUSTED",
            StopReason::TotalCapReached => "TOTAL_CAP_REACHED",
            StopReason::BreakerTripped => "BREAKER_TRIPPED",
        };
        write!(f, "{s}")
    }
}

/// Counters for a single reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub candidates: usize,
    pub processed: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub errors: usize,
    /// Candidates another writer resolved before our update landed
    pub already_terminal: usize,
    /// Candidates skipped by the per-organization cap
    pub skipped: usize,
    pub per_org: HashMap<OrganizationId, usize>,
    pub stop_reason: StopReason,
}

impl RunStats {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            processed: 0,
            confirmed: 0,
            failed: 0,
            errors: 0,
            already_terminal: 0,
            skipped: 0,
            per_org: HashMap::new(),
            stop_reason: StopReason::Exhausted,
        }
    }

    /// Fraction of processed candidates whose update errored
    pub fn error_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.errors as f64 / self.processed as f64
        }
    }

    pub fn org_count(&self, organization_id: &OrganizationId) -> usize {
        self.per_org.get(organization_id).copied().unwrap_or(0)
    }
}
