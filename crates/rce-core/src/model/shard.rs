// crates/rce-core/src/model/shard.rs
// ============================================================================
// Module: ShardPart
// Description: The atomic unit appended to a Shard.
// Purpose: Canonical type for spec.md §3/§4.2 ShardPart; the on-disk codec
// lives in rce-sharding, which builds and consumes this type.
// Dependencies: serde, serde_json
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// One `(policy-name, location, timestamp, resources[])` tuple.
///
/// # Invariants
/// - `resources` is a JSON array of objects; the wire encoding (see
///   `rce-sharding`) carries it as an opaque UTF-8 JSON payload and does not
///   interpret its shape.
/// - `timestamp` is a Unix timestamp in seconds, matching the binary
///   format's `float64 unix_ts` field verbatim (no sub-second rounding is
///   applied beyond what `f64` already implies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardPart {
    pub policy_name: String,
    pub location: String,
    pub timestamp: f64,
    pub resources: Vec<Value>,
}

impl ShardPart {
    /// Builds a new part with the given fields.
    #[must_use]
    pub fn new(
        policy_name: impl Into<String>,
        location: impl Into<String>,
        timestamp: f64,
        resources: Vec<Value>,
    ) -> Self {
        Self {
            policy_name: policy_name.into(),
            location: location.into(),
            timestamp,
            resources,
        }
    }

    /// `(policy, location)` key used by distributors and merge grouping.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (self.policy_name.as_str(), self.location.as_str())
    }
}

/// Descriptor for one entry of the `meta.json` sidecar: `policy -> { ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
