// crates/rce-core/src/model/exception.rs
// ============================================================================
// Module: ResourceException
// Description: User-declared filter excluding matching resources from
// violation reports.
// Purpose: Canonical type for spec.md §3 ResourceException, §4.3.6 filter.
// Dependencies: crate::identifiers, chrono, serde
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::identifiers::CustomerId;
use crate::identifiers::ResourceExceptionId;
use crate::identifiers::TenantId;

/// A `key=value` tag filter; a resource matches when it carries a tag with
/// this exact key and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
}

/// A user-declared filter that excludes matching cloud resources from
/// violation reports.
///
/// # Invariants
/// - A field that is `None` is not considered when matching; all populated
///   fields (including every entry of `tag_filters`) must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceException {
    pub id: ResourceExceptionId,
    pub customer_id: CustomerId,
    pub tenant_id: TenantId,
    pub resource_id: Option<String>,
    pub location: Option<String>,
    pub resource_type: Option<String>,
    pub arn: Option<String>,
    pub tag_filters: Vec<TagFilter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
}

impl ResourceException {
    /// True when `now >= expiration`; an exception with no expiration never
    /// expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| now >= exp)
    }

    /// Builds a new, non-expiring exception with a fresh id.
    #[must_use]
    pub fn new(
        customer_id: CustomerId,
        tenant_id: TenantId,
        resource_id: Option<String>,
        location: Option<String>,
        resource_type: Option<String>,
        arn: Option<String>,
        tag_filters: Vec<TagFilter>,
        expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ResourceExceptionId::new(Uuid::new_v4()),
            customer_id,
            tenant_id,
            resource_id,
            location,
            resource_type,
            arn,
            tag_filters,
            created_at: now,
            updated_at: now,
            expiration,
        }
    }
}
