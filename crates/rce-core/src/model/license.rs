// crates/rce-core/src/model/license.rs
// ============================================================================
// Module: License
// Description: Entitlement record granted by the License Manager.
// Purpose: Canonical type for spec.md §3 License, §4.5 tenant selection.
// Dependencies: crate::identifiers, chrono, std::collections::BTreeMap, serde
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::LicenseKey;
use crate::identifiers::RulesetName;
use crate::identifiers::TenantId;

/// How a license's job balance is consumed across its tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceExhaustionModel {
    /// One shared balance across every tenant the license covers.
    Collective,
    /// Each tenant tracks its own balance independently.
    Independent,
}

/// Allowance reset cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeRange {
    Day,
    Week,
    Month,
}

/// Job allowance granted by a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub model: BalanceExhaustionModel,
    pub job_balance: u32,
    pub time_range: TimeRange,
}

/// Whether a customer scope permits or prohibits the listed tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentModel {
    Permitted,
    Prohibited,
}

/// A `CUSTODIAN_LICENSES` parent record scoping one customer's access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerScope {
    pub tenant_license_key: LicenseKey,
    pub attachment_model: AttachmentModel,
    pub tenant_names: Vec<TenantId>,
}

impl CustomerScope {
    /// Applies the §4.5 attachment-model rule for one tenant.
    ///
    /// - `Permitted` + tenant in list, or list empty => permitted.
    /// - `Prohibited` + tenant not in list => permitted.
    /// - otherwise => denied.
    #[must_use]
    pub fn permits(&self, tenant: &TenantId) -> bool {
        let listed = self.tenant_names.iter().any(|t| t == tenant);
        match self.attachment_model {
            AttachmentModel::Permitted => listed || self.tenant_names.is_empty(),
            AttachmentModel::Prohibited => !listed,
        }
    }
}

/// An entitlement granted by the License Manager.
///
/// # Invariants
/// - Expired when `now >= expiration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub key: LicenseKey,
    pub expiration: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
    pub allowance: Allowance,
    pub event_driven: bool,
    pub customer_scopes: BTreeMap<CustomerId, CustomerScope>,
    pub ruleset_names: Vec<RulesetName>,
}

impl License {
    /// True when `now >= expiration`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// True when this license is attached to `customer` and permits
    /// `tenant` per its attachment model.
    #[must_use]
    pub fn permits(&self, customer: &CustomerId, tenant: &TenantId) -> bool {
        self.customer_scopes
            .get(customer)
            .is_some_and(|scope| scope.permits(tenant))
    }
}

/// Relative priority of a license's scope when selecting among candidates
/// for a tenant; lower sorts first. Grounded in spec.md §4.5: "iterate the
/// tenant's linked parent records in the order (specific-tenant-scope ->
/// all-cloud-scope -> all-scope)".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScopeRank {
    SpecificTenant,
    AllCloud,
    All,
}

/// A license candidate together with the scope rank it was registered
/// under, used by [`select_license_for_tenant`].
#[derive(Debug, Clone)]
pub struct ScopedLicense {
    pub license: License,
    pub rank: ScopeRank,
    /// Identifies the License Manager application this record originated
    /// from, used to deduplicate parent records per §4.5.
    pub application_id: String,
}

/// Selects the applicable license for a tenant per spec.md §4.5.
///
/// Candidates are iterated in `(SpecificTenant, AllCloud, All)` order,
/// deduplicated by `application_id` (first occurrence wins), and the first
/// non-expired, permitting license is returned.
#[must_use]
pub fn select_license_for_tenant(
    candidates: &[ScopedLicense],
    customer: &CustomerId,
    tenant: &TenantId,
    now: DateTime<Utc>,
) -> Option<&License> {
    let mut ordered: Vec<&ScopedLicense> = candidates.iter().collect();
    ordered.sort_by_key(|c| c.rank);

    let mut seen_applications = std::collections::BTreeSet::new();
    for candidate in ordered {
        if !seen_applications.insert(candidate.application_id.clone()) {
            continue;
        }
        if candidate.license.is_expired(now) {
            continue;
        }
        if candidate.license.permits(customer, tenant) {
            return Some(&candidate.license);
        }
    }
    None
}
