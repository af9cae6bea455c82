//! Balance snapshot and mutation candidate types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::key::{balance_cache_key, candidate_cache_key};
use crate::core_types::{BalanceId, BalanceVersion, LedgerId, OrganizationId};

/// Versioned balance as held in the read-side cache.
///
/// The cache copy is advisory. The authoritative row lives in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub id: BalanceId,
    pub organization_id: OrganizationId,
    pub ledger_id: LedgerId,
    pub alias: String,
    pub key: String,
    pub version: BalanceVersion,
    pub available: Decimal,
    pub on_hold: Decimal,
    pub account_type: String,
    pub allow_sending: bool,
    pub allow_receiving: bool,
    pub updated_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn cache_key(&self) -> String {
        balance_cache_key(&self.organization_id, &self.ledger_id, &self.alias, &self.key)
    }
}

/// Incoming balance update, not yet applied to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMutation {
    pub id: BalanceId,
    pub organization_id: OrganizationId,
    pub ledger_id: LedgerId,
    /// Raw alias, possibly `<ordinal>#<alias>#<key>`
    pub alias: String,
    pub version: BalanceVersion,
    pub available: Decimal,
    pub on_hold: Decimal,
}

impl BalanceMutation {
    pub fn cache_key(&self) -> String {
        candidate_cache_key(&self.organization_id, &self.ledger_id, &self.alias)
    }
}
