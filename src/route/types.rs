//! Operation route types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::{LedgerId, OrganizationId, RouteId};

/// Which side of a double-entry operation a route applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Source,
    Destination,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Source => "source",
            OperationType::Destination => "destination",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "source" => Some(OperationType::Source),
            "destination" => Some(OperationType::Destination),
            _ => None,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation route referenced by id from transaction routes and
/// transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRoute {
    pub id: RouteId,
    pub organization_id: OrganizationId,
    pub ledger_id: LedgerId,
    pub title: String,
    pub description: Option<String>,
    pub operation_type: OperationType,
    /// Alias the route is pinned to, if any
    pub account_alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
