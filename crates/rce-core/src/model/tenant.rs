// crates/rce-core/src/model/tenant.rs
// ============================================================================
// Module: Tenant & Customer
// Description: Scannable cloud account and its billing/grouping parent.
// Purpose: Canonical types for spec.md §3 Tenant/Customer.
// Dependencies: crate::identifiers, chrono, serde
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::TenantId;

/// Cloud provider a tenant scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cloud {
    Aws,
    Azure,
    Google,
    Kubernetes,
}

/// A scannable cloud account.
///
/// # Invariants
/// - Immutable after creation except `active_regions` and `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub customer_id: CustomerId,
    pub cloud: Cloud,
    /// Native account/subscription/project id for `cloud`.
    pub native_id: String,
    pub active_regions: Vec<String>,
    pub active: bool,
    pub activated_at: DateTime<Utc>,
}

impl Tenant {
    /// True when `region` is in the tenant's active set.
    #[must_use]
    pub fn scans_region(&self, region: &str) -> bool {
        self.active_regions.iter().any(|r| r == region)
    }
}

/// Billing/grouping parent of one or more tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub admin_contacts: Vec<String>,
}
