//! Scenario tests across the consistency core
//!
//! Exercise the reconciler, the stale-update filter and route resolution
//! together against in-memory stores. No database needed.

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::balance::{
        BalanceCache, BalanceMutation, BalanceSnapshot, MemoryCacheStore, StaleUpdateFilter,
    };
    use crate::cancel::CancelToken;
    use crate::clock::MockClock;
    use crate::reconcile::config::{ReconcilerConfig, ReconcilerSettings};
    use crate::reconcile::observer::{ReconcileEvent, RecordingObserver};
    use crate::reconcile::reconciler::PendingReconciler;
    use crate::reconcile::repository::MockTransactionRepository;
    use crate::reconcile::status::BalanceStatus;
    use crate::reconcile::types::StopReason;
    use crate::retry::RetryPolicy;
    use crate::route::RouteResolver;
    use crate::route::repository::MockRouteRepository;

    const OVERDUE: Duration = Duration::from_secs(25 * 3600 + 60);

    struct TestHarness {
        reconciler: PendingReconciler,
        repo: Arc<MockTransactionRepository>,
        observer: Arc<RecordingObserver>,
    }

    impl TestHarness {
        fn new(settings: ReconcilerSettings) -> Self {
            let repo = Arc::new(MockTransactionRepository::new());
            let observer = Arc::new(RecordingObserver::new());
            let reconciler = PendingReconciler::new(
                repo.clone(),
                Arc::new(MockClock::new()),
                observer.clone(),
                ReconcilerConfig::from_settings(&settings),
            );
            Self {
                reconciler,
                repo,
                observer,
            }
        }
    }

    fn snapshot(org: Uuid, ledger: Uuid, alias: &str, version: i64) -> BalanceSnapshot {
        BalanceSnapshot {
            id: Uuid::new_v4(),
            organization_id: org,
            ledger_id: ledger,
            alias: alias.to_string(),
            key: "default".to_string(),
            version,
            available: Decimal::new(10_000, 2),
            on_hold: Decimal::ZERO,
            account_type: "deposit".to_string(),
            allow_sending: true,
            allow_receiving: true,
            updated_at: Utc::now(),
        }
    }

    fn mutation(org: Uuid, ledger: Uuid, alias: &str, version: i64) -> BalanceMutation {
        BalanceMutation {
            id: Uuid::new_v4(),
            organization_id: org,
            ledger_id: ledger,
            alias: alias.to_string(),
            version,
            available: Decimal::new(5_000, 2),
            on_hold: Decimal::ZERO,
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Mixed tenants, mixed proofs, tight guardrails from YAML-style settings
    #[tokio::test]
    async fn test_guarded_run_over_mixed_tenants() {
        let h = TestHarness::new(ReconcilerSettings {
            max_total_per_run: Some(6),
            max_per_org_per_run: Some(3),
            sleep_between_min_ms: Some(0),
            sleep_jitter_ms: Some(0),
            ..Default::default()
        });
        let whale = Uuid::new_v4();
        let small = Uuid::new_v4();

        let whale_ids: Vec<_> = (0..5)
            .map(|_| h.repo.insert_pending(whale, OVERDUE, Some(Utc::now())))
            .collect();
        let small_ids: Vec<_> = (0..4)
            .map(|_| h.repo.insert_pending(small, OVERDUE, None))
            .collect();

        let stats = h
            .reconciler
            .run_with_rng(&CancelToken::new(), &mut StdRng::seed_from_u64(11))
            .await
            .unwrap();

        assert_eq!(stats.processed, 6);
        assert_eq!(stats.org_count(&whale), 3);
        assert_eq!(stats.org_count(&small), 3);
        assert_eq!(stats.confirmed, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.stop_reason, StopReason::TotalCapReached);

        let confirmed = whale_ids
            .iter()
            .filter(|id| h.repo.status_of(**id) == Some(BalanceStatus::Confirmed))
            .count();
        let failed = small_ids
            .iter()
            .filter(|id| h.repo.status_of(**id) == Some(BalanceStatus::Failed))
            .count();
        assert_eq!(confirmed, 3);
        assert_eq!(failed, 3);

        // whale's 4th and 5th skipped, then small's 4th hits the total cap
        assert_eq!(stats.skipped, 2);
        assert_eq!(h.observer.org_caps(), vec![whale]);
    }

    /// Deferred work from a capped run is picked up by the next one
    #[tokio::test]
    async fn test_next_run_finishes_deferred_work() {
        let h = TestHarness::new(ReconcilerSettings {
            max_per_org_per_run: Some(2),
            sleep_between_min_ms: Some(0),
            sleep_jitter_ms: Some(0),
            ..Default::default()
        });
        let org = Uuid::new_v4();
        let ids: Vec<_> = (0..5)
            .map(|_| h.repo.insert_pending(org, OVERDUE, None))
            .collect();

        let mut total = 0;
        for _ in 0..3 {
            let stats = h
                .reconciler
                .run_with_rng(&CancelToken::new(), &mut StdRng::seed_from_u64(5))
                .await
                .unwrap();
            assert!(stats.processed <= 2);
            total += stats.processed;
        }

        assert_eq!(total, 5);
        assert!(
            ids.iter()
                .all(|id| h.repo.status_of(*id) == Some(BalanceStatus::Failed))
        );
    }

    /// A tripped run leaves the remainder PENDING for the next run
    #[tokio::test]
    async fn test_breaker_leaves_remainder_pending() {
        let h = TestHarness::new(ReconcilerSettings {
            max_error_rate: Some(0.5),
            min_processed_for_rate_check: Some(4),
            sleep_between_min_ms: Some(0),
            sleep_jitter_ms: Some(0),
            ..Default::default()
        });
        let org = Uuid::new_v4();
        let ids: Vec<_> = (0..10)
            .map(|_| h.repo.insert_pending(org, OVERDUE, None))
            .collect();
        h.repo.fail_updates_after(2);

        let stats = h
            .reconciler
            .run_with_rng(&CancelToken::new(), &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();

        // 3 errors / 5 processed = 0.6 > 0.5
        assert_eq!(stats.processed, 5);
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.stop_reason, StopReason::BreakerTripped);

        let pending = ids
            .iter()
            .filter(|id| h.repo.status_of(**id) == Some(BalanceStatus::Pending))
            .count();
        assert_eq!(pending, 8);

        let tripped = h.observer.events().into_iter().find_map(|e| match e {
            ReconcileEvent::BreakerTripped { error_rate, .. } => Some(error_rate),
            _ => None,
        });
        assert_eq!(tripped, Some(0.6));
    }

    // ========================================================================
    // Write path: route lookup, then stale-update filtering
    // ========================================================================

    #[tokio::test]
    async fn test_write_path_with_lagging_routes_and_out_of_order_mutations() {
        let org = Uuid::new_v4();
        let ledger = Uuid::new_v4();

        // Routes created a moment ago, visible on the third read
        let routes = Arc::new(MockRouteRepository::new());
        let source = routes.insert(org, ledger, "cash-out");
        let destination = routes.insert(org, ledger, "cash-in");
        routes.set_hidden_reads(2);

        let clock = Arc::new(MockClock::new());
        let resolver = RouteResolver::new(routes.clone(), clock.clone(), RetryPolicy::default());
        let resolved = resolver
            .resolve(
                &CancelToken::new(),
                org,
                ledger,
                &[source.id, destination.id],
            )
            .await
            .unwrap();
        assert_eq!(resolved, vec![source, destination]);
        assert_eq!(clock.sleeps().len(), 2);

        // Cache already reflects version 10 of @alice and 3 of @bob
        let cache = Arc::new(BalanceCache::with_default_ttl(Arc::new(
            MemoryCacheStore::new(),
        )));
        cache.store(&snapshot(org, ledger, "@alice", 10)).await.unwrap();
        cache.store(&snapshot(org, ledger, "@bob", 3)).await.unwrap();

        let filter = StaleUpdateFilter::new(cache.clone());
        let batch = vec![
            mutation(org, ledger, "0#@alice#default", 5),
            mutation(org, ledger, "@bob", 5),
            mutation(org, ledger, "@carol", 1),
        ];
        let (kept, outcome) = filter.filter_with_outcome(batch.clone()).await;

        assert_eq!(kept, vec![batch[1].clone(), batch[2].clone()]);
        assert_eq!(outcome.stale, 1);
        assert_eq!(outcome.misses, 1);

        // Applying @bob v5 makes a late v4 stale
        cache.store(&snapshot(org, ledger, "@bob", 5)).await.unwrap();
        let late = vec![mutation(org, ledger, "@bob#default", 4)];
        assert!(filter.filter(late).await.is_empty());
    }
}
