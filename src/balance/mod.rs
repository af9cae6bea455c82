//! Balance cache consistency
//!
//! The read-side cache holds one versioned [`BalanceSnapshot`] per
//! (organization, ledger, alias#key). Versions only move forward, which lets
//! the [`StaleUpdateFilter`] drop superseded mutations that arrive out of
//! order without any locking.

pub mod cache;
pub mod filter;
pub mod key;
pub mod snapshot;

pub use cache::{BalanceCache, CacheLookup, CacheStore, MemoryCacheStore, StoreOutcome};
pub use filter::{FilterOutcome, StaleUpdateFilter};
pub use key::{balance_cache_key, candidate_cache_key, normalize_candidate_alias};
pub use snapshot::{BalanceMutation, BalanceSnapshot};
