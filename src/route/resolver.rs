//! Route resolution with read-after-write retry
//!
//! A transaction route may reference operation routes created moments
//! earlier. Until those rows are visible to the read path the lookup reports
//! not-found; the resolver backs off and retries instead of failing the
//! write.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::repository::{OperationRouteRepository, ensure_all_found};
use super::types::OperationRoute;
use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::core_types::{LedgerId, OrganizationId, RouteId};
use crate::error::LedgerError;
use crate::logging::TRACE_TARGET;
use crate::retry::{RetryPolicy, retry_on_not_found};

pub struct RouteResolver {
    repo: Arc<dyn OperationRouteRepository>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RouteResolver {
    pub fn new(
        repo: Arc<dyn OperationRouteRepository>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            repo,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch every route in `ids`, in request order.
    ///
    /// # Errors
    /// - `Validation` for an empty or duplicated id list (no read issued)
    /// - `NotFound` when routes stay invisible for the whole retry budget
    /// - `Canceled` when `cancel` fires during a backoff
    /// - any other repository error, unretried
    pub async fn resolve(
        &self,
        cancel: &CancelToken,
        organization_id: OrganizationId,
        ledger_id: LedgerId,
        ids: &[RouteId],
    ) -> Result<Vec<OperationRoute>, LedgerError> {
        validate_ids(ids)?;

        let repo = self.repo.as_ref();
        let routes = retry_on_not_found(
            &self.policy,
            self.clock.as_ref(),
            cancel,
            "operation_route",
            move |attempt| {
                debug!(
                    target: TRACE_TARGET,
                    organization_id = %organization_id,
                    ledger_id = %ledger_id,
                    count = ids.len(),
                    attempt,
                    "Looking up operation routes"
                );
                repo.find_by_ids(organization_id, ledger_id, ids)
            },
        )
        .await?;

        order_by_request(ids, routes)
    }
}

fn validate_ids(ids: &[RouteId]) -> Result<(), LedgerError> {
    if ids.is_empty() {
        return Err(LedgerError::Validation(
            "at least one operation route id is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(LedgerError::Validation(format!(
            "duplicate operation route id {dup}"
        )));
    }
    Ok(())
}

fn order_by_request(
    ids: &[RouteId],
    mut routes: Vec<OperationRoute>,
) -> Result<Vec<OperationRoute>, LedgerError> {
    ensure_all_found(ids, &routes)?;
    routes.sort_by_key(|r| ids.iter().position(|id| *id == r.id));
    routes.dedup_by_key(|r| r.id);
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelCause;
    use crate::clock::MockClock;
    use crate::error::ErrorKind;
    use crate::route::repository::MockRouteRepository;
    use std::time::Duration;
    use uuid::Uuid;

    struct TestHarness {
        resolver: RouteResolver,
        repo: Arc<MockRouteRepository>,
        clock: Arc<MockClock>,
        org: Uuid,
        ledger: Uuid,
    }

    impl TestHarness {
        fn new(max_attempts: u32) -> Self {
            let repo = Arc::new(MockRouteRepository::new());
            let clock = Arc::new(MockClock::new());
            let policy = RetryPolicy::new(Some(max_attempts), Some(Duration::from_millis(50)));
            Self {
                resolver: RouteResolver::new(repo.clone(), clock.clone(), policy),
                repo,
                clock,
                org: Uuid::new_v4(),
                ledger: Uuid::new_v4(),
            }
        }
    }

    #[tokio::test]
    async fn test_resolves_in_request_order() {
        let h = TestHarness::new(3);
        let a = h.repo.insert(h.org, h.ledger, "a");
        let b = h.repo.insert(h.org, h.ledger, "b");
        let c = h.repo.insert(h.org, h.ledger, "c");

        let routes = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[b.id, a.id, c.id])
            .await
            .unwrap();

        assert_eq!(routes, vec![b, a, c]);
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_route_to_become_visible() {
        let h = TestHarness::new(5);
        let route = h.repo.insert(h.org, h.ledger, "fresh");
        h.repo.set_hidden_reads(2);

        let routes = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[route.id])
            .await
            .unwrap();

        assert_eq!(routes, vec![route]);
        assert_eq!(h.repo.call_count(), 3);
        assert_eq!(
            h.clock.sleeps(),
            vec![Duration::from_millis(50), Duration::from_millis(100)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let h = TestHarness::new(4);
        let route = h.repo.insert(h.org, h.ledger, "late");
        h.repo.set_hidden_reads(10);

        let err = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[route.id])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(h.repo.call_count(), 4);
        assert_eq!(h.clock.sleeps().len(), 3);
    }

    #[tokio::test]
    async fn test_infrastructure_error_not_retried() {
        let h = TestHarness::new(5);
        let route = h.repo.insert(h.org, h.ledger, "x");
        h.repo.set_broken(true);

        let err = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[route.id])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(h.repo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_backoff() {
        let h = TestHarness::new(5);
        let route = h.repo.insert(h.org, h.ledger, "x");
        h.repo.set_hidden_reads(10);
        let cancel = CancelToken::new();
        cancel.cancel(CancelCause::Requested);

        let err = h
            .resolver
            .resolve(&cancel, h.org, h.ledger, &[route.id])
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Canceled(CancelCause::Requested));
        assert_eq!(h.repo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_duplicate_ids() {
        let h = TestHarness::new(5);
        let id = Uuid::new_v4();

        let err = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = h
            .resolver
            .resolve(&CancelToken::new(), h.org, h.ledger, &[id, id])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.repo.call_count(), 0);
    }
}
