//! Balance status of a transaction
//!
//! ```text
//! PENDING ──(balance_persisted_at set)──▶ CONFIRMED
//!    │
//!    └─────(balance_persisted_at null)──▶ FAILED
//! ```
//!
//! CONFIRMED and FAILED are terminal. Stored as TEXT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    /// Balance mutation not yet proven applied
    Pending,

    /// Terminal: balance mutation durably applied
    Confirmed,

    /// Terminal: balance mutation never applied within the retry window
    Failed,
}

impl BalanceStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BalanceStatus::Confirmed | BalanceStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition
    #[inline]
    pub fn can_transition_to(&self, next: BalanceStatus) -> bool {
        *self == BalanceStatus::Pending && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceStatus::Pending => "PENDING",
            BalanceStatus::Confirmed => "CONFIRMED",
            BalanceStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BalanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BalanceStatus::Pending),
            "CONFIRMED" => Ok(BalanceStatus::Confirmed),
            "FAILED" => Ok(BalanceStatus::Failed),
            other => Err(format!("unknown balance status '{other}'")),
        }
    }
}
