//! Pending-transaction reconciliation
//!
//! A transaction is written PENDING before its balance mutation is applied.
//! The write path retries the mutation for 24 hours; anything still PENDING
//! after that (plus a buffer) is resolved here.
//!
//! # State Machine
//!
//! ```text
//! PENDING ─▶ CONFIRMED   (balance_persisted_at set)
//!    │
//!    └─────▶ FAILED      (balance_persisted_at null)
//! ```
//!
//! # Guardrails
//!
//! 1. **Total cap**: at most `max_total_per_run` updates per run
//! 2. **Fairness**: at most `max_per_org_per_run` updates per organization
//! 3. **Circuit breaker**: stop once the update error rate exceeds
//!    `max_error_rate` past a minimum sample
//! 4. **Pacing**: jittered, cancellable pause between updates

pub mod config;
mod integration_tests;
pub mod observer;
pub mod reconciler;
pub mod repository;
pub mod status;
pub mod types;
pub mod worker;

pub use config::{ReconcilerConfig, ReconcilerSettings};
pub use observer::{ReconcileEvent, ReconcileObserver, TracingObserver};
pub use reconciler::PendingReconciler;
pub use repository::{PgTransactionRepository, TransactionRepository};
pub use status::BalanceStatus;
pub use types::{PendingTransaction, RunStats, StopReason};
pub use worker::ReconcileWorker;
