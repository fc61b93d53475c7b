// crates/rce-license/src/version.rs
// ============================================================================
// Module: Version Negotiation
// Description: Maps the License Manager's `Accept-Version` response to a
// client variant gating which endpoints are usable.
// Purpose: spec.md §4.5 "the factory picks the highest compatible client
// variant (<2.7, >=2.7, >=3.0)".
// Dependencies: none
// ============================================================================

/// Client behavior variant selected from the License Manager's advertised
/// version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientVariant {
    /// Pre-2.7: `check-permission` takes a single tenant, no ruleset
    /// publishing endpoint.
    Legacy,
    /// `>= 2.7`: `check-permission` accepts a tenant list and returns the
    /// allowed subset.
    TenantList,
    /// `>= 3.0`: ruleset publishing (`/registry/ruleset`) is available.
    RulesetPublishing,
}

impl ClientVariant {
    /// True once this variant's endpoints include bulk `check-permission`.
    #[must_use]
    pub fn supports_tenant_list_permission(self) -> bool {
        self >= ClientVariant::TenantList
    }

    /// True once this variant's endpoints include `/registry/ruleset`.
    #[must_use]
    pub fn supports_ruleset_publishing(self) -> bool {
        self >= ClientVariant::RulesetPublishing
    }
}

/// Parses a `major.minor` (optionally `major.minor.patch`) version string
/// from `GET /whoami`'s `Accept-Version` header into a [`ClientVariant`].
/// Unparseable input is treated as [`ClientVariant::Legacy`]: the safest
/// fallback is the narrowest feature set.
#[must_use]
pub fn negotiate(accept_version: &str) -> ClientVariant {
    let mut parts = accept_version.trim().splitn(3, '.');
    let major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

    if (major, minor) >= (3, 0) {
        ClientVariant::RulesetPublishing
    } else if (major, minor) >= (2, 7) {
        ClientVariant::TenantList
    } else {
        ClientVariant::Legacy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_2_7_is_legacy() {
        assert_eq!(negotiate("2.6"), ClientVariant::Legacy);
        assert_eq!(negotiate("1.9.3"), ClientVariant::Legacy);
    }

    #[test]
    fn at_least_2_7_is_tenant_list() {
        assert_eq!(negotiate("2.7"), ClientVariant::TenantList);
        assert_eq!(negotiate("2.9.1"), ClientVariant::TenantList);
    }

    #[test]
    fn at_least_3_0_is_ruleset_publishing() {
        assert_eq!(negotiate("3.0"), ClientVariant::RulesetPublishing);
        assert_eq!(negotiate("4.1"), ClientVariant::RulesetPublishing);
    }

    #[test]
    fn garbage_falls_back_to_legacy() {
        assert_eq!(negotiate("not-a-version"), ClientVariant::Legacy);
    }

    #[test]
    fn ordering_gates_feature_checks() {
        assert!(ClientVariant::RulesetPublishing.supports_tenant_list_permission());
        assert!(!ClientVariant::TenantList.supports_ruleset_publishing());
    }
}
