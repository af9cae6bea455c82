//! Stale-Update Filter
//!
//! Drops balance mutations that the cache proves are superseded, before the
//! authoritative apply step. The decision is a pure version comparison:
//!
//! | Cache state                        | Decision |
//! |------------------------------------|----------|
//! | miss / unavailable / malformed     | keep     |
//! | hit, `cached >= candidate`         | drop     |
//! | hit, `cached <  candidate`         | keep     |
//!
//! Cache problems never fail the batch. Without cache information the
//! mutation goes through and the store stays the arbiter (fail-open).

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use super::cache::{BalanceCache, CacheLookup};
use super::snapshot::BalanceMutation;
use crate::logging::TRACE_TARGET;

/// Per-batch tally of filter decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Candidates passed through
    pub kept: usize,
    /// Dropped because the cache holds an equal or newer version
    pub stale: usize,
    /// Kept because no entry was cached
    pub misses: usize,
    /// Kept because the cache errored
    pub unavailable: usize,
    /// Kept because the cached entry could not be decoded
    pub malformed: usize,
}

/// Classify one candidate against a cache read. `true` keeps it.
fn is_applicable(candidate: &BalanceMutation, lookup: &CacheLookup) -> bool {
    match lookup {
        CacheLookup::Hit(cached) => cached.version < candidate.version,
        CacheLookup::Miss | CacheLookup::Malformed(_) | CacheLookup::Unavailable(_) => true,
    }
}

pub struct StaleUpdateFilter {
    cache: Arc<BalanceCache>,
}

impl StaleUpdateFilter {
    pub fn new(cache: Arc<BalanceCache>) -> Self {
        Self { cache }
    }

    /// Order-preserving subsequence of `candidates` still worth applying
    pub async fn filter(&self, candidates: Vec<BalanceMutation>) -> Vec<BalanceMutation> {
        self.filter_with_outcome(candidates).await.0
    }

    /// Same as [`filter`](Self::filter), plus the decision tally.
    ///
    /// Cache reads for the batch run concurrently. Never writes the cache.
    pub async fn filter_with_outcome(
        &self,
        candidates: Vec<BalanceMutation>,
    ) -> (Vec<BalanceMutation>, FilterOutcome) {
        let keys: Vec<String> = candidates.iter().map(|c| c.cache_key()).collect();
        let lookups = join_all(keys.iter().map(|key| self.cache.lookup(key))).await;

        let mut outcome = FilterOutcome::default();
        let mut kept = Vec::with_capacity(candidates.len());

        for ((candidate, lookup), key) in candidates.into_iter().zip(lookups).zip(&keys) {
            match &lookup {
                CacheLookup::Miss => outcome.misses += 1,
                CacheLookup::Unavailable(_) => outcome.unavailable += 1,
                CacheLookup::Malformed(_) => outcome.malformed += 1,
                CacheLookup::Hit(_) => {}
            }

            if is_applicable(&candidate, &lookup) {
                outcome.kept += 1;
                kept.push(candidate);
            } else {
                outcome.stale += 1;
                debug!(
                    target: TRACE_TARGET,
                    key = %key,
                    candidate_version = candidate.version,
                    cached_version = lookup.snapshot().map(|s| s.version),
                    "Dropping stale balance update"
                );
            }
        }

        if outcome.stale > 0 {
            debug!(
                kept = outcome.kept,
                stale = outcome.stale,
                "Filtered stale balance updates"
            );
        }

        (kept, outcome)
    }
}
