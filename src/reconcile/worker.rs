//! Reconcile Worker
//!
//! Background loop that triggers one reconcile run per scan interval.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::reconciler::PendingReconciler;
use super::types::RunStats;
use crate::cancel::{CancelToken, sleep_or_cancel};
use crate::clock::Clock;
use crate::error::LedgerError;

pub struct ReconcileWorker {
    reconciler: Arc<PendingReconciler>,
    clock: Arc<dyn Clock>,
}

impl ReconcileWorker {
    pub fn new(reconciler: Arc<PendingReconciler>, clock: Arc<dyn Clock>) -> Self {
        Self { reconciler, clock }
    }

    /// Run the worker loop until `shutdown` fires.
    ///
    /// A failed run is logged and retried on the next tick.
    pub async fn run(&self, shutdown: &CancelToken) {
        let config = self.reconciler.config();
        info!(
            scan_interval_secs = config.scan_interval.as_secs(),
            threshold_age_secs = config.threshold_age.as_secs(),
            batch_size = config.batch_size,
            run_timeout_secs = config.run_timeout.map(|t| t.as_secs()),
            "Starting reconcile worker"
        );

        loop {
            match self.run_once(shutdown).await {
                Ok(_) => {}
                Err(_) if shutdown.is_cancelled() => break,
                Err(e) if e.is_canceled() => {
                    warn!(error = %e, "Reconcile run stopped before finishing");
                }
                Err(e) => {
                    error!(error = %e, code = e.code(), "Reconcile run failed");
                }
            }

            if sleep_or_cancel(self.clock.as_ref(), shutdown, config.scan_interval)
                .await
                .is_err()
            {
                break;
            }
        }

        info!("Reconcile worker stopped");
    }

    /// Single run under the configured deadline
    pub async fn run_once(&self, shutdown: &CancelToken) -> Result<RunStats, LedgerError> {
        let run_token = shutdown.child();
        let deadline = self
            .reconciler
            .config()
            .run_timeout
            .map(|timeout| run_token.cancel_after(self.clock.clone(), timeout));

        let result = self.reconciler.run(&run_token).await;

        if let Some(handle) = deadline {
            handle.abort();
        }
        result
    }
}
