// crates/rce-reports/src/coverage.rs
// ============================================================================
// Module: Coverage Math
// Description: Per-standard coverage ratio from the rule-to-control mapping
// carried in RuleMetadata.
// Purpose: spec.md §4.3.5.
// Dependencies: rce-core, rce-sharding
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rce_core::identifiers::RuleName;
use rce_core::interfaces::MetadataRegistry;
use rce_sharding::PartFilter;
use rce_sharding::ShardsCollection;

use crate::error::ReportsError;

/// Accumulates per-control coverage ratios into a single standard-wide
/// figure. `update` is called once per control with that control's
/// `successful_rules / total_rules` ratio; `produce` averages them.
#[derive(Debug, Default)]
pub struct StandardCoverageCalculator {
    ratios: Vec<f64>,
}

impl StandardCoverageCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, ratio: f64) -> &mut Self {
        self.ratios.push(ratio.clamp(0.0, 1.0));
        self
    }

    /// Normalized 0..1 average across every control seen by `update`. An
    /// empty accumulator produces `0.0`.
    #[must_use]
    pub fn produce(&self) -> f64 {
        if self.ratios.is_empty() {
            0.0
        } else {
            self.ratios.iter().sum::<f64>() / self.ratios.len() as f64
        }
    }
}

/// One standard's coverage result.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardCoverage {
    pub standard: String,
    pub total_controls: usize,
    pub successful_controls: usize,
    pub coverage: f64,
}

/// Computes `coverage[S]` for one standard: for every control the standard
/// maps to at least one rule for, the control is "successful" when every
/// mapped rule ran without error (absent from `failed_rules`) and produced
/// zero violating resources in `collection`.
///
/// # Errors
/// Returns [`ReportsError::UnknownStandard`] when the registry has no rule
/// mapped to `standard`.
pub fn coverage_for_standard(
    standard: &str,
    registry: &dyn MetadataRegistry,
    collection: &ShardsCollection,
    failed_rules: &BTreeSet<RuleName>,
) -> Result<StandardCoverage, ReportsError> {
    let rule_names = registry.rules_for_standard(standard);
    if rule_names.is_empty() {
        return Err(ReportsError::UnknownStandard(standard.to_string()));
    }

    let mut control_to_rules: BTreeMap<String, Vec<RuleName>> = BTreeMap::new();
    for name in &rule_names {
        let meta = registry.lookup(name)?;
        if let Some(versions) = meta.standards.get(standard) {
            for control_ids in versions.values() {
                for control_id in control_ids {
                    control_to_rules.entry(control_id.clone()).or_default().push(name.clone());
                }
            }
        }
    }

    let mut calculator = StandardCoverageCalculator::new();
    let mut successful_controls = 0;
    for rules in control_to_rules.values() {
        let successful = rules.iter().filter(|r| !failed_rules.contains(r) && rule_has_zero_violations(collection, r)).count();
        calculator.update(successful as f64 / rules.len() as f64);
        if successful == rules.len() {
            successful_controls += 1;
        }
    }

    Ok(StandardCoverage {
        standard: standard.to_string(),
        total_controls: control_to_rules.len(),
        successful_controls,
        coverage: calculator.produce(),
    })
}

fn rule_has_zero_violations(collection: &ShardsCollection, rule: &RuleName) -> bool {
    let filter = PartFilter { policy: Some(rule.as_str().to_string()), region: None };
    collection.iter_parts(&filter).all(|part| part.resources.is_empty())
}

#[cfg(test)]
mod tests {
    use rce_core::model::Cloud;
    use rce_core::model::RuleMetadata;
    use rce_core::model::Severity;
    use rce_core::model::ShardPart;
    use rce_core::static_registry::StaticMetadataRegistry;
    use serde_json::json;

    use super::*;

    fn metadata(rule: &str, standard: &str, controls: &[&str]) -> RuleMetadata {
        let mut versions = BTreeMap::new();
        versions.insert("1.0".to_string(), controls.iter().map(|c| (*c).to_string()).collect());
        let mut standards = BTreeMap::new();
        standards.insert(standard.to_string(), versions);
        RuleMetadata {
            rule_name: RuleName::new(rule),
            severity: Severity::High,
            standards,
            mitre_techniques: vec![],
            remediation: String::new(),
            reported_fields: vec![],
        }
    }

    #[test]
    fn full_coverage_when_all_mapped_rules_pass() {
        let registry = StaticMetadataRegistry::new([metadata("r1", "cis-aws", &["1.1"])]);
        let collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        let coverage = coverage_for_standard("cis-aws", &registry, &collection, &BTreeSet::new()).expect("coverage");
        assert_eq!(coverage.total_controls, 1);
        assert_eq!(coverage.successful_controls, 1);
        assert!((coverage.coverage - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn violating_resource_fails_control_coverage() {
        let registry = StaticMetadataRegistry::new([metadata("r1", "cis-aws", &["1.1"])]);
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "x"})]));
        let coverage = coverage_for_standard("cis-aws", &registry, &collection, &BTreeSet::new()).expect("coverage");
        assert_eq!(coverage.successful_controls, 0);
        assert!((coverage.coverage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_standard_errors() {
        let registry = StaticMetadataRegistry::new([]);
        let collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        assert!(coverage_for_standard("missing", &registry, &collection, &BTreeSet::new()).is_err());
    }
}
