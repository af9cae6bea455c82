//! PostgreSQL schema for the consistency core

use sqlx::PgPool;

use crate::error::LedgerError;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                   UUID PRIMARY KEY,
    organization_id      UUID NOT NULL,
    ledger_id            UUID NOT NULL,
    balance_status       TEXT NOT NULL DEFAULT 'PENDING'
        CHECK (balance_status IN ('PENDING', 'CONFIRMED', 'FAILED')),
    balance_persisted_at TIMESTAMPTZ,
    created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at           TIMESTAMPTZ
)
"#;

const CREATE_TRANSACTIONS_PENDING_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_transactions_pending_created
    ON transactions (created_at)
    WHERE balance_status = 'PENDING' AND deleted_at IS NULL
"#;

const CREATE_OPERATION_ROUTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS operation_routes (
    id              UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    ledger_id       UUID NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT,
    operation_type  TEXT NOT NULL CHECK (operation_type IN ('source', 'destination')),
    account_alias   TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at      TIMESTAMPTZ
)
"#;

/// Create tables and indexes if missing
pub async fn init_schema(pool: &PgPool) -> Result<(), LedgerError> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in [
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("idx_transactions_pending_created", CREATE_TRANSACTIONS_PENDING_INDEX),
        ("operation_routes", CREATE_OPERATION_ROUTES_TABLE),
    ] {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            LedgerError::DatabaseError(format!("failed to create {name}: {e}"))
        })?;
    }

    tracing::info!("PostgreSQL schema initialized");
    Ok(())
}
