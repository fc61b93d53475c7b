// crates/rce-core/src/model/rule.rs
// ============================================================================
// Module: Rule
// Description: Atomic compliance check definition.
// Purpose: Canonical type for spec.md §3 Rule.
// Dependencies: crate::identifiers, std::collections::BTreeMap, serde
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::RuleName;
use crate::identifiers::RuleSourceId;
use crate::model::tenant::Cloud;

/// Rule severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// `{standard-name -> version -> [control-ids]}`.
pub type StandardsRefs = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// An atomic compliance check.
///
/// # Invariants
/// - Identity is `(name, rule_source_id)`: the same name may recur across
///   different rule-sources as an unrelated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable name across versions of the same rule-source.
    pub name: RuleName,
    pub rule_source_id: RuleSourceId,
    pub cloud: Cloud,
    pub resource_type: String,
    pub severity: Severity,
    pub description: String,
    pub remediation: String,
    pub impact: String,
    pub standards: StandardsRefs,
    pub mitre_techniques: Vec<String>,
    pub article: Option<String>,
    pub service_section: Option<String>,
    pub commit_hash: Option<String>,
    /// Commit timestamp from the blame query that stamped `commit_hash`
    /// (spec.md §4.6). Absent when blame information was unavailable.
    pub updated_date: Option<DateTime<Utc>>,
    pub source_path: String,
    /// Set when the rule's source comments flag it as applying to every
    /// region rather than the region it was scanned in (spec.md §4.3.2).
    pub global: bool,
}

impl Rule {
    /// Identity tuple used for catalog upsert/diff keying.
    #[must_use]
    pub fn identity(&self) -> (&str, &RuleSourceId) {
        (self.name.as_str(), &self.rule_source_id)
    }

    /// Stamps blame information onto this rule, per spec.md §4.6. Missing
    /// blame data is tolerated by the caller, not here: pass `None` and the
    /// existing stamp (if any) is cleared.
    pub fn stamp_blame(&mut self, blame: Option<(String, DateTime<Utc>)>) {
        match blame {
            Some((commit_hash, updated_date)) => {
                self.commit_hash = Some(commit_hash);
                self.updated_date = Some(updated_date);
            }
            None => {
                self.commit_hash = None;
                self.updated_date = None;
            }
        }
    }
}
