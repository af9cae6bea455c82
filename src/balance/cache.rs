//! Versioned Cache Gateway
//!
//! Thin layer over a string key-value cache holding JSON-encoded
//! [`BalanceSnapshot`]s. Reads classify every outcome so callers can decide
//! how to treat a miss, an outage or a corrupt entry; writes never move a
//! snapshot's version backwards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use super::snapshot::BalanceSnapshot;
use crate::clock::{Clock, SystemClock};
use crate::core_types::BalanceVersion;
use crate::error::LedgerError;

/// Default time-to-live for cached balances
pub const DEFAULT_BALANCE_TTL: Duration = Duration::from_secs(3600);

/// Raw key-value cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, LedgerError>;

    /// A zero `ttl` means the entry does not expire
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), LedgerError>;
}

struct CacheEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process cache store with per-entry expiry
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until next read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let now = self.clock.now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if !entry.expires_at.is_some_and(|at| at <= now) {
                    return Ok(Some(entry.value.clone()));
                }
            }
        }
        // Expired: drop it unless a concurrent set already replaced it
        self.entries
            .remove_if(key, |_, entry| entry.expires_at.is_some_and(|at| at <= now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), LedgerError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl = chrono::Duration::from_std(ttl)
                .map_err(|e| LedgerError::Validation(format!("cache ttl out of range: {e}")))?;
            self.clock.now().checked_add_signed(ttl)
        };
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }
}

/// Outcome of a single cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(BalanceSnapshot),
    Miss,
    /// Entry present but not a decodable snapshot
    Malformed(String),
    /// Cache backend errored
    Unavailable(LedgerError),
}

impl CacheLookup {
    pub fn snapshot(&self) -> Option<&BalanceSnapshot> {
        match self {
            CacheLookup::Hit(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Outcome of [`BalanceCache::store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Written,
    /// The cache already holds a newer version
    SkippedOlder { cached_version: BalanceVersion },
}

/// Gateway over a [`CacheStore`] for balance snapshots
pub struct BalanceCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl BalanceCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn with_default_ttl(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, DEFAULT_BALANCE_TTL)
    }

    /// Read and decode the snapshot under `key`
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        match self.store.get(key).await {
            Ok(None) => CacheLookup::Miss,
            Ok(Some(raw)) => match serde_json::from_str::<BalanceSnapshot>(&raw) {
                Ok(snapshot) => CacheLookup::Hit(snapshot),
                Err(e) => {
                    warn!(key, error = %e, "Malformed balance snapshot in cache");
                    CacheLookup::Malformed(e.to_string())
                }
            },
            Err(e) => {
                warn!(key, error = %e, "Balance cache unavailable");
                CacheLookup::Unavailable(e)
            }
        }
    }

    /// Write `snapshot` unless the cache already holds a newer version.
    ///
    /// Read-then-write is not atomic; the cache stays advisory and the
    /// version filter downstream tolerates a lost race.
    pub async fn store(&self, snapshot: &BalanceSnapshot) -> Result<StoreOutcome, LedgerError> {
        let key = snapshot.cache_key();

        if let CacheLookup::Hit(cached) = self.lookup(&key).await
            && cached.version > snapshot.version
        {
            debug!(
                key = %key,
                cached_version = cached.version,
                version = snapshot.version,
                "Skipping cache write, newer version present"
            );
            return Ok(StoreOutcome::SkippedOlder {
                cached_version: cached.version,
            });
        }

        let value = serde_json::to_string(snapshot)
            .map_err(|e| LedgerError::CacheError(format!("encode snapshot: {e}")))?;
        self.store.set(&key, value, self.ttl).await?;
        Ok(StoreOutcome::Written)
    }
}


#[cfg(test)]
pub use mock::FailingCacheStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn snapshot(version: BalanceVersion) -> BalanceSnapshot {
        BalanceSnapshot {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            ledger_id: Uuid::nil(),
            alias: "@acct".to_string(),
            key: "default".to_string(),
            version,
            available: Decimal::new(100, 0),
            on_hold: Decimal::ZERO,
            account_type: "deposit".to_string(),
            allow_sending: true,
            allow_receiving: true,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_expires_entries() {
        let clock = Arc::new(MockClock::new());
        let store = MemoryCacheStore::with_clock(clock.clone());

        store
            .set("k", "v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        clock.sleep(Duration::from_secs(10)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_zero_ttl_never_expires() {
        let clock = Arc::new(MockClock::new());
        let store = MemoryCacheStore::with_clock(clock.clone());

        store.set("k", "v".to_string(), Duration::ZERO).await.unwrap();
        clock.sleep(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_classifies_outcomes() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = BalanceCache::with_default_ttl(store.clone());
        let snap = snapshot(3);

        assert_eq!(cache.lookup(&snap.cache_key()).await, CacheLookup::Miss);

        cache.store(&snap).await.unwrap();
        assert_eq!(
            cache.lookup(&snap.cache_key()).await,
            CacheLookup::Hit(snap.clone())
        );

        store
            .set(&snap.cache_key(), "{not json".to_string(), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(
            cache.lookup(&snap.cache_key()).await,
            CacheLookup::Malformed(_)
        ));

        let down = BalanceCache::with_default_ttl(Arc::new(FailingCacheStore::new()));
        assert!(matches!(
            down.lookup(&snap.cache_key()).await,
            CacheLookup::Unavailable(LedgerError::CacheError(_))
        ));
    }

    #[tokio::test]
    async fn test_store_never_regresses_version() {
        let cache = BalanceCache::with_default_ttl(Arc::new(MemoryCacheStore::new()));

        assert_eq!(cache.store(&snapshot(7)).await, Ok(StoreOutcome::Written));
        assert_eq!(
            cache.store(&snapshot(5)).await,
            Ok(StoreOutcome::SkippedOlder { cached_version: 7 })
        );
        // Equal version refreshes the entry
        assert_eq!(cache.store(&snapshot(7)).await, Ok(StoreOutcome::Written));
        assert_eq!(cache.store(&snapshot(8)).await, Ok(StoreOutcome::Written));

        let key = snapshot(0).cache_key();
        assert_eq!(cache.lookup(&key).await.snapshot().map(|s| s.version), Some(8));
    }

    #[tokio::test]
    async fn test_store_surfaces_backend_error() {
        let cache = BalanceCache::with_default_ttl(Arc::new(FailingCacheStore::new()));
        let result = cache.store(&snapshot(1)).await;
        assert!(matches!(result, Err(LedgerError::CacheError(_))));
    }
}
