//! Operation route persistence

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::types::{OperationRoute, OperationType};
use crate::core_types::{LedgerId, OrganizationId, RouteId};
use crate::error::LedgerError;

#[async_trait]
pub trait OperationRouteRepository: Send + Sync {
    /// Fetch routes by id within one ledger.
    ///
    /// Returns [`LedgerError::NotFound`] when any requested id is missing,
    /// so callers can tell "not visible yet" from an outage.
    async fn find_by_ids(
        &self,
        organization_id: OrganizationId,
        ledger_id: LedgerId,
        ids: &[RouteId],
    ) -> Result<Vec<OperationRoute>, LedgerError>;
}

/// Check that every requested id came back; report the ones that did not
pub(crate) fn ensure_all_found(
    ids: &[RouteId],
    routes: &[OperationRoute],
) -> Result<(), LedgerError> {
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !routes.iter().any(|r| r.id == **id))
        .map(|id| id.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::not_found(
            "operation_route",
            missing.join(","),
        ))
    }
}

/// PostgreSQL-backed repository
pub struct PgOperationRouteRepository {
    pool: PgPool,
}

impl PgOperationRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_route(row: &sqlx::postgres::PgRow) -> Result<OperationRoute, LedgerError> {
        let op_type: String = row.try_get("operation_type")?;
        let operation_type = OperationType::from_db(&op_type).ok_or_else(|| {
            LedgerError::CorruptRecord(format!("unknown operation_type '{op_type}'"))
        })?;

        Ok(OperationRoute {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            ledger_id: row.try_get("ledger_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            operation_type,
            account_alias: row.try_get("account_alias")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OperationRouteRepository for PgOperationRouteRepository {
    async fn find_by_ids(
        &self,
        organization_id: OrganizationId,
        ledger_id: LedgerId,
        ids: &[RouteId],
    ) -> Result<Vec<OperationRoute>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, ledger_id, title, description,
                   operation_type, account_alias, created_at, updated_at
            FROM operation_routes
            WHERE organization_id = $1
              AND ledger_id = $2
              AND id = ANY($3)
              AND deleted_at IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(ledger_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let routes = rows
            .iter()
            .map(Self::row_to_route)
            .collect::<Result<Vec<_>, _>>()?;

        ensure_all_found(ids, &routes)?;
        Ok(routes)
    }
}


#[cfg(test)]
pub use mock::MockRouteRepository;
