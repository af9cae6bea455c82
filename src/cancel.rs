//! Cancellation Token
//!
//! Explicit cancellation threaded through every suspension point. A token is
//! cancelled once, with a [`CancelCause`]; later calls to `cancel` are no-ops.
//! Child tokens observe their parent's cancellation but can also be cancelled
//! on their own (e.g. a per-run deadline) without touching the parent.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::LedgerError;

/// Why a token fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelCause {
    /// Process is shutting down
    Shutdown,
    /// A run or call deadline elapsed
    DeadlineExceeded,
    /// Caller asked to stop
    Requested,
}

impl CancelCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelCause::Shutdown => "SHUTDOWN",
            CancelCause::DeadlineExceeded => "DEADLINE_EXCEEDED",
            CancelCause::Requested => "REQUESTED",
        }
    }
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Inner {
    tx: watch::Sender<Option<CancelCause>>,
    parent: Option<CancelToken>,
}

#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancelToken>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(Inner { tx, parent }),
        }
    }

    /// Create a token that fires when `self` fires, or when cancelled directly
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    /// Fire the token. Returns false if it had already fired.
    pub fn cancel(&self, cause: CancelCause) -> bool {
        self.inner.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(cause);
            true
        })
    }

    /// Cause of cancellation, own first, then inherited
    pub fn cause(&self) -> Option<CancelCause> {
        let own = *self.inner.tx.borrow();
        own.or_else(|| self.inner.parent.as_ref().and_then(|p| p.cause()))
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// `Err(Canceled)` if the token has fired
    pub fn check(&self) -> Result<(), LedgerError> {
        match self.cause() {
            Some(cause) => Err(LedgerError::Canceled(cause)),
            None => Ok(()),
        }
    }

    /// Resolves with the cause once this token or any ancestor fires
    pub fn cancelled(&self) -> BoxFuture<'_, CancelCause> {
        Box::pin(async move {
            let own = async {
                let mut rx = self.inner.tx.subscribe();
                loop {
                    let current = *rx.borrow_and_update();
                    if let Some(cause) = current {
                        return cause;
                    }
                    if rx.changed().await.is_err() {
                        return std::future::pending().await;
                    }
                }
            };

            match &self.inner.parent {
                Some(parent) => tokio::select! {
                    cause = own => cause,
                    cause = parent.cancelled() => cause,
                },
                None => own.await,
            }
        })
    }

    /// Fire with `DeadlineExceeded` after `timeout` on `clock`.
    ///
    /// Abort the returned handle once the guarded work finishes.
    pub fn cancel_after(&self, clock: Arc<dyn Clock>, timeout: Duration) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            clock.sleep(timeout).await;
            if token.cancel(CancelCause::DeadlineExceeded) {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Deadline exceeded");
            }
        })
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cause", &self.cause())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// An already-fired token wins over a zero-length sleep.
pub async fn sleep_or_cancel(
    clock: &dyn Clock,
    cancel: &CancelToken,
    duration: Duration,
) -> Result<(), LedgerError> {
    tokio::select! {
        biased;
        cause = cancel.cancelled() => Err(LedgerError::Canceled(cause)),
        _ = clock.sleep(duration) => Ok(()),
    }
}
