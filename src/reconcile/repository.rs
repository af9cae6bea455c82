//! Transaction Repository
//!
//! Read overdue PENDING transactions and move them to a terminal balance
//! status. The status update is conditional on the row still being PENDING,
//! so two racing runs cannot leave a terminal state.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::status::BalanceStatus;
use super::types::PendingTransaction;
use crate::core_types::{LedgerId, OrganizationId, TransactionId};
use crate::error::LedgerError;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Up to `batch_size` PENDING transactions created more than
    /// `threshold` ago
    async fn find_pending_for_reconciliation(
        &self,
        threshold: Duration,
        batch_size: usize,
    ) -> Result<Vec<PendingTransaction>, LedgerError>;

    /// Move a PENDING transaction to `status`.
    ///
    /// Returns `false` when no PENDING row matched, i.e. the row is gone or
    /// another writer already moved it to a terminal state. That row is left
    /// untouched and it is not an error.
    async fn update_balance_status(
        &self,
        organization_id: OrganizationId,
        ledger_id: LedgerId,
        id: TransactionId,
        status: BalanceStatus,
    ) -> Result<bool, LedgerError>;
}

/// PostgreSQL-backed repository
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_pending(row: &sqlx::postgres::PgRow) -> Result<PendingTransaction, LedgerError> {
        let status: String = row.try_get("balance_status")?;
        let balance_status = status
            .parse::<BalanceStatus>()
            .map_err(LedgerError::CorruptRecord)?;

        Ok(PendingTransaction {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            ledger_id: row.try_get("ledger_id")?,
            balance_status,
            balance_persisted_at: row.try_get("balance_persisted_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn find_pending_for_reconciliation(
        &self,
        threshold: Duration,
        batch_size: usize,
    ) -> Result<Vec<PendingTransaction>, LedgerError> {
        let threshold_secs = threshold.as_secs() as i64;

        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, ledger_id, balance_status,
                   balance_persisted_at, created_at
            FROM transactions
            WHERE balance_status = $1
              AND created_at < NOW() - INTERVAL '1 second' * $2
              AND deleted_at IS NULL
            ORDER BY created_at ASC
            LIMIT $3
            "#,
        )
        .bind(BalanceStatus::Pending.as_str())
        .bind(threshold_secs)
        .bind(batch_size as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_pending).collect()
    }

    async fn update_balance_status(
        &self,
        organization_id: OrganizationId,
        ledger_id: LedgerId,
        id: TransactionId,
        status: BalanceStatus,
    ) -> Result<bool, LedgerError> {
        if !BalanceStatus::Pending.can_transition_to(status) {
            return Err(LedgerError::Validation(format!(
                "cannot move balance status to {status}"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET balance_status = $1, updated_at = NOW()
            WHERE organization_id = $2
              AND ledger_id = $3
              AND id = $4
              AND balance_status = $5
            "#,
        )
        .bind(status.as_str())
        .bind(organization_id)
        .bind(ledger_id)
        .bind(id)
        .bind(BalanceStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if !updated {
            debug!(
                transaction_id = %id,
                status = %status,
                "Transaction already left PENDING, update skipped"
            );
        }

        Ok(updated)
    }
}


#[cfg(test)]
pub use mock::MockTransactionRepository;
