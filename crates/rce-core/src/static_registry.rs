// crates/rce-core/src/static_registry.rs
// ============================================================================
// Module: Static Metadata Registry
// Description: In-memory MetadataRegistry seeded from a fixed rule set.
// Purpose: Stand in for the license-supplied metadata bundle of spec.md §3
// for local operation and tests.
// Dependencies: crate::{identifiers, interfaces, model}, std::collections::BTreeMap
// ============================================================================

use std::collections::BTreeMap;

use crate::identifiers::RuleName;
use crate::interfaces::MetadataRegistry;
use crate::interfaces::MetadataRegistryError;
use crate::model::RuleMetadata;

/// A `MetadataRegistry` backed by a plain in-memory map, built once at
/// process start from whatever bundle the caller loaded (e.g. a bundled
/// JSON fixture, or rows fetched from `rce-store-sqlite`'s catalog
/// surface). Carries no I/O of its own.
#[derive(Debug, Default, Clone)]
pub struct StaticMetadataRegistry {
    entries: BTreeMap<RuleName, RuleMetadata>,
}

impl StaticMetadataRegistry {
    /// Builds a registry from an already-loaded set of entries.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = RuleMetadata>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.rule_name.clone(), entry))
                .collect(),
        }
    }
}

impl MetadataRegistry for StaticMetadataRegistry {
    fn lookup(&self, rule: &RuleName) -> Result<RuleMetadata, MetadataRegistryError> {
        self.entries
            .get(rule)
            .cloned()
            .ok_or_else(|| MetadataRegistryError::NotFound(rule.clone()))
    }

    fn rules_for_standard(&self, standard: &str) -> Vec<RuleName> {
        self.entries
            .values()
            .filter(|entry| entry.standards.contains_key(standard))
            .map(|entry| entry.rule_name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::Severity;

    fn sample(name: &str, standard: &str) -> RuleMetadata {
        let mut standards = BTreeMap::new();
        standards.insert(standard.to_string(), BTreeMap::from([(
            "1.0".to_string(),
            vec!["1.1".to_string()],
        )]));
        RuleMetadata {
            rule_name: RuleName::new(name),
            severity: Severity::High,
            standards,
            mitre_techniques: vec![],
            remediation: "fix it".to_string(),
            reported_fields: vec!["id".to_string()],
        }
    }

    #[test]
    fn lookup_returns_registered_entry() {
        let registry = StaticMetadataRegistry::new([sample("ec2-public", "cis-aws")]);
        let found = registry.lookup(&RuleName::new("ec2-public")).expect("found");
        assert_eq!(found.severity, Severity::High);
    }

    #[test]
    fn lookup_missing_rule_errors() {
        let registry = StaticMetadataRegistry::new([]);
        assert!(registry.lookup(&RuleName::new("missing")).is_err());
    }

    #[test]
    fn rules_for_standard_filters_by_membership() {
        let registry = StaticMetadataRegistry::new([
            sample("a", "cis-aws"),
            sample("b", "pci-dss"),
        ]);
        assert_eq!(registry.rules_for_standard("cis-aws"), vec![RuleName::new("a")]);
    }
}
