//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

use uuid::Uuid;

/// Organization ID - tenant scope of every ledger entity.
///
/// # Usage:
/// - Per-tenant fairness caps in reconciliation
/// - First component of every balance cache key
pub type OrganizationId = Uuid;

/// Ledger ID - unique within an organization
pub type LedgerId = Uuid;

/// Transaction ID
pub type TransactionId = Uuid;

/// Balance ID
pub type BalanceId = Uuid;

/// Operation route ID
pub type RouteId = Uuid;

/// Balance version - monotonic per (organization, ledger, alias#key).
///
/// # Constraints:
/// - **Monotonic**: never decreases over a snapshot's lifetime
/// - **Signed**: stored as PostgreSQL BIGINT
pub type BalanceVersion = i64;
