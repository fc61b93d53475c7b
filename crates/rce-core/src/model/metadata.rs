// crates/rce-core/src/model/metadata.rs
// ============================================================================
// Module: Metadata
// Description: Read-only registry record enriching a rule with severity,
// standards, and MITRE mappings.
// Purpose: Canonical type for spec.md §3 Metadata; consumed by the Report
// Derivation Pipeline's coverage math (§4.3.5) and the MetadataRegistry
// collaborator trait (see crate::interfaces).
// Dependencies: crate::{identifiers, model::rule}, serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::RuleName;
use crate::model::rule::Severity;
use crate::model::rule::StandardsRefs;

/// Enriched, version-bundled fields for one rule name. Distinct from
/// [`crate::model::rule::Rule`]: `Rule` is catalog data owned by a
/// rule-source, `RuleMetadata` is license-supplied enrichment that may be
/// revised independently of the rule catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub rule_name: RuleName,
    pub severity: Severity,
    pub standards: StandardsRefs,
    pub mitre_techniques: Vec<String>,
    pub remediation: String,
    /// Fields a report derivation is permitted to project from a matching
    /// resource, per spec.md §4.3.3 ("keep only the report fields declared
    /// by the rule's metadata plus mandatory identity fields").
    pub reported_fields: Vec<String>,
}
