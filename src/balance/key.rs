//! Balance cache key derivation
//!
//! Candidate aliases arrive from the transaction path as
//! `<ordinal>#<alias>[#<key>]`, where the ordinal is the entry's position in
//! the transaction. The cache is keyed on `<alias>#<key>` only, so the ordinal
//! is stripped first and a missing sub-key becomes `default`.
//!
//! Snapshots already hold the alias and sub-key apart and never carry an
//! ordinal, so their key is a plain join.
//!
//! # Legal aliases
//! Neither the account alias nor the balance sub-key contains `#`. Under that
//! rule [`normalize_candidate_alias`] loses nothing but the ordinal.

use crate::core_types::{LedgerId, OrganizationId};

/// Sub-key used when an alias carries none
pub const DEFAULT_BALANCE_KEY: &str = "default";

const SEPARATOR: char = '#';

/// Strip a leading all-digit ordinal segment.
pub fn strip_ordinal(raw: &str) -> &str {
    if let Some((head, rest)) = raw.split_once(SEPARATOR)
        && !head.is_empty()
        && head.bytes().all(|b| b.is_ascii_digit())
    {
        return rest;
    }
    raw
}

/// Add the default sub-key to a bare alias. `alias#key` is left alone.
pub fn normalize_alias(alias: &str) -> String {
    if alias.contains(SEPARATOR) {
        alias.to_string()
    } else {
        alias_with_key(alias, DEFAULT_BALANCE_KEY)
    }
}

/// Normalize a candidate alias to `alias#key`.
///
/// ```ignore
/// assert_eq!(normalize_candidate_alias("0#@acct#tag"), "@acct#tag");
/// assert_eq!(normalize_candidate_alias("3#@acct"), "@acct#default");
/// assert_eq!(normalize_candidate_alias("@acct"), "@acct#default");
/// ```
pub fn normalize_candidate_alias(raw: &str) -> String {
    normalize_alias(strip_ordinal(raw))
}

/// Join an account alias and balance sub-key
pub fn alias_with_key(alias: &str, key: &str) -> String {
    format!("{alias}{SEPARATOR}{key}")
}

/// Cache key for a snapshot's alias and sub-key
pub fn balance_cache_key(
    organization_id: &OrganizationId,
    ledger_id: &LedgerId,
    alias: &str,
    key: &str,
) -> String {
    scoped_key(organization_id, ledger_id, &alias_with_key(alias, key))
}

/// Cache key for a raw candidate alias
pub fn candidate_cache_key(
    organization_id: &OrganizationId,
    ledger_id: &LedgerId,
    raw_alias: &str,
) -> String {
    scoped_key(
        organization_id,
        ledger_id,
        &normalize_candidate_alias(raw_alias),
    )
}

fn scoped_key(organization_id: &OrganizationId, ledger_id: &LedgerId, alias_key: &str) -> String {
    format!("balance:{}:{}:{}", organization_id, ledger_id, alias_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_strip_ordinal() {
        assert_eq!(strip_ordinal("0#@acct#tag"), "@acct#tag");
        assert_eq!(strip_ordinal("17#@acct#default"), "@acct#default");
        assert_eq!(strip_ordinal("3#@acct"), "@acct");
        assert_eq!(strip_ordinal("@acct#tag"), "@acct#tag");
        assert_eq!(strip_ordinal("#@acct#tag"), "#@acct#tag");
        assert_eq!(strip_ordinal("x1#@acct#tag"), "x1#@acct#tag");
        assert_eq!(strip_ordinal("12"), "12");
    }

    #[test]
    fn test_normalize_adds_default_key() {
        assert_eq!(normalize_alias("@acct"), "@acct#default");
        assert_eq!(normalize_alias("@acct#tag"), "@acct#tag");
        // Snapshot side never strips, even for a numeric alias
        assert_eq!(normalize_alias("12#default"), "12#default");
    }

    #[test]
    fn test_candidate_without_sub_key_gets_default() {
        assert_eq!(normalize_candidate_alias("3#@acct"), "@acct#default");
        assert_eq!(normalize_candidate_alias("0#@acct#tag"), "@acct#tag");
        assert_eq!(normalize_candidate_alias("@acct"), "@acct#default");

        let org = Uuid::new_v4();
        let ledger = Uuid::new_v4();
        assert_eq!(
            candidate_cache_key(&org, &ledger, "3#@acct"),
            balance_cache_key(&org, &ledger, "@acct", DEFAULT_BALANCE_KEY)
        );
        assert_eq!(
            candidate_cache_key(&org, &ledger, "3#@acct"),
            candidate_cache_key(&org, &ledger, "@acct")
        );
    }

    #[test]
    fn test_prefixed_and_plain_share_a_key() {
        let org = Uuid::new_v4();
        let ledger = Uuid::new_v4();
        assert_eq!(
            candidate_cache_key(&org, &ledger, "0#@acct#tag"),
            candidate_cache_key(&org, &ledger, "@acct#tag")
        );
        assert_eq!(
            balance_cache_key(&org, &ledger, "@acct", "tag"),
            format!("balance:{org}:{ledger}:@acct#tag")
        );
    }

    #[test]
    fn test_scopes_are_distinct() {
        let org = Uuid::new_v4();
        let ledger_a = Uuid::new_v4();
        let ledger_b = Uuid::new_v4();
        assert_ne!(
            balance_cache_key(&org, &ledger_a, "@acct", "tag"),
            balance_cache_key(&org, &ledger_b, "@acct", "tag")
        );
    }
}
