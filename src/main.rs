//! Ledger consistency service
//!
//! Runs the pending-transaction reconciler against PostgreSQL.
//!
//! ```text
//! ┌──────────┐    ┌────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Config  │───▶│  Worker    │───▶│  Reconciler  │───▶│ transactions │
//! │  (YAML)  │    │ (interval) │    │ (guardrails) │    │ (PostgreSQL) │
//! └──────────┘    └────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Flags:
//! - `--env <name>` / `-e <name>`: load `config/<name>.yaml` (default `dev`)
//! - `--once`: run a single reconcile pass and exit

use std::sync::Arc;

use anyhow::Context;

use ledger_consistency::cancel::{CancelCause, CancelToken};
use ledger_consistency::clock::SystemClock;
use ledger_consistency::config::AppConfig;
use ledger_consistency::db::Database;
use ledger_consistency::db::schema::init_schema;
use ledger_consistency::reconcile::{
    PendingReconciler, PgTransactionRepository, ReconcileWorker, TracingObserver,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn use_once_mode() -> bool {
    std::env::args().any(|a| a == "--once")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).with_context(|| format!("load config for {env}"))?;
    let _log_guard = ledger_consistency::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "Starting ledger consistency service"
    );

    let postgres_url = app_config
        .postgres_url
        .as_deref()
        .context("postgres_url is required")?;
    let db = Database::connect(postgres_url)
        .await
        .context("connect to PostgreSQL")?;
    db.health_check().await.context("PostgreSQL health check")?;
    init_schema(db.pool()).await.context("initialize schema")?;

    let clock = Arc::new(SystemClock);
    let reconciler = PendingReconciler::new(
        Arc::new(PgTransactionRepository::new(db.pool().clone())),
        clock.clone(),
        Arc::new(TracingObserver),
        app_config.reconciler_config(),
    );
    let worker = ReconcileWorker::new(Arc::new(reconciler), clock);

    let shutdown = CancelToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.cancel(CancelCause::Shutdown);
            }
        });
    }

    if use_once_mode() {
        let stats = worker.run_once(&shutdown).await.context("reconcile run")?;
        tracing::info!(
            processed = stats.processed,
            confirmed = stats.confirmed,
            failed = stats.failed,
            errors = stats.errors,
            stop_reason = %stats.stop_reason,
            "Single reconcile run complete"
        );
    } else {
        worker.run(&shutdown).await;
    }

    Ok(())
}
