// crates/rce-core/src/identifiers.rs
// ============================================================================
// Module: Core Identifiers
// Description: Canonical opaque identifiers for tenants, customers, rules,
// rulesets, licenses, jobs, and the other entities in the data model.
// Purpose: Provide strongly typed, serializable identifiers with stable
// wire forms and documented identity invariants (see spec.md §3).
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Identifiers are opaque wrappers around their wire representation. None of
//! them perform domain validation beyond what their own doc comment claims;
//! callers that need stronger validation (e.g. rule-source id derivation)
//! compose these types with dedicated constructors.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Generates a simple opaque string identifier newtype.
macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

/// Generates a UUID-backed identifier newtype.
macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[must_use]
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random (v4) identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn get(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(CustomerId, "Customer identifier (billing/grouping parent of tenants).");
string_id!(TenantId, "Tenant identifier, stable for the lifetime of the cloud account.");
string_id!(RuleName, "Stable rule name, unique within a rule-source across versions.");
string_id!(RuleSourceId, "Rule-source identifier, deterministically derived (see `RuleSourceId::derive`).");
string_id!(RulesetName, "Ruleset name, unique within `(customer, cloud)`.");
string_id!(RulesetVersion, "Ruleset version label.");
string_id!(LicenseKey, "Entitlement key issued by the License Manager.");
string_id!(ScheduledJobId, "Sanitized, stable identifier for a recurring scheduled job.");
string_id!(CelerySlotId, "Native worker-runtime task identifier (e.g. Batch job id).");

uuid_id!(JobId, "Identifier of a single scan execution (Job).");
uuid_id!(BatchResultId, "Identifier of an event-driven scan execution (BatchResult).");
uuid_id!(ResourceExceptionId, "Identifier of a user-declared resource exception.");

impl RuleSourceId {
    /// Deterministically derives a rule-source id from its defining tuple.
    ///
    /// Per spec.md §3: "id is deterministically derived from (customer, url,
    /// project-id, ref, prefix)". The derivation uses a stable SHA-256 over
    /// the tuple fields joined by a separator byte not expected to appear in
    /// any field, so two rule-sources with the same defining tuple always
    /// resolve to the same id regardless of insertion order.
    #[must_use]
    pub fn derive(
        customer: &CustomerId,
        url: &str,
        project_id: &str,
        git_ref: &str,
        prefix: Option<&str>,
    ) -> Self {
        use sha2::Digest;
        let joined = format!(
            "{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}",
            customer.as_str(),
            url,
            project_id,
            git_ref,
            prefix.unwrap_or("")
        );
        let digest = sha2::Sha256::digest(joined.as_bytes());
        Self::new(hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_source_id_is_deterministic() {
        let customer = CustomerId::new("acme");
        let a = RuleSourceId::derive(&customer, "https://github.com/acme/rules", "42", "main", Some("policies/"));
        let b = RuleSourceId::derive(&customer, "https://github.com/acme/rules", "42", "main", Some("policies/"));
        assert_eq!(a, b);
    }

    #[test]
    fn rule_source_id_distinguishes_fields() {
        let customer = CustomerId::new("acme");
        let a = RuleSourceId::derive(&customer, "https://github.com/acme/rules", "42", "main", None);
        let b = RuleSourceId::derive(&customer, "https://github.com/acme/rules", "42", "dev", None);
        assert_ne!(a, b);
    }

    #[test]
    fn job_id_round_trips_uuid() {
        let id = JobId::generate();
        let json = serde_json::to_string(&id).expect("serialize");
        let back: JobId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }
}
