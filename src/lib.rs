//! Ledger Consistency Core
//!
//! Keeps a double-entry ledger's read-side cache and transaction statuses
//! consistent with the authoritative store.
//!
//! # Modules
//!
//! - [`core_types`] - Id and version aliases
//! - [`error`] - `LedgerError` and its closed `ErrorKind` classification
//! - [`clock`] - Injectable time source
//! - [`cancel`] - Cancellation tokens and cancellable sleep
//! - [`retry`] - Not-found retry with exponential backoff
//! - [`balance`] - Versioned balance cache and stale-update filter
//! - [`route`] - Operation route lookup tolerant of visibility lag
//! - [`reconcile`] - Guarded PENDING transaction reconciler and its worker
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;
pub mod error;

// Time and cancellation
pub mod cancel;
pub mod clock;
pub mod retry;

// Consistency components
pub mod balance;
pub mod reconcile;
pub mod route;

// Infrastructure
pub mod config;
pub mod db;
pub mod logging;

// Convenient re-exports at crate root
pub use balance::{
    BalanceCache, BalanceMutation, BalanceSnapshot, CacheStore, MemoryCacheStore,
    StaleUpdateFilter,
};
pub use cancel::{CancelCause, CancelToken};
pub use clock::{Clock, SystemClock};
pub use core_types::{BalanceVersion, LedgerId, OrganizationId, RouteId, TransactionId};
pub use error::{ErrorKind, LedgerError};
pub use reconcile::{
    BalanceStatus, PendingReconciler, PendingTransaction, ReconcileEvent, ReconcileObserver,
    ReconcileWorker, ReconcilerConfig, RunStats, StopReason, TransactionRepository,
};
pub use retry::{RetryPolicy, retry_on_not_found};
pub use route::{OperationRoute, OperationRouteRepository, RouteResolver};
