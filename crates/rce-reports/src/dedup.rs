// crates/rce-reports/src/dedup.rs
// ============================================================================
// Module: Dedup and Field Projection
// Description: Keep one copy per unique resource within (rule, region), and
// drop fields the rule's metadata does not declare reportable.
// Purpose: spec.md §4.3.3.
// Dependencies: rce-core, serde_json, crate::resource
// ============================================================================

use std::collections::BTreeSet;

use rce_core::model::RuleMetadata;
use serde_json::Map;
use serde_json::Value;

use crate::resource::CloudResource;

/// Fields kept on every projection regardless of `reported_fields`: without
/// these, a consumer cannot identify which resource a finding refers to.
const MANDATORY_IDENTITY_FIELDS: &[&str] = &["id", "name", "arn", "urn", "namespace", "resource_type"];

/// Drops duplicate resources within one `(rule, region)` group, keeping the
/// first occurrence by [`CloudResource::identity_hash`], then projects each
/// survivor's `data` down to `metadata.reported_fields` plus the mandatory
/// identity fields.
#[must_use]
pub fn dedup_and_project(resources: Vec<CloudResource>, metadata: &RuleMetadata) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for resource in resources {
        let hash = resource.identity_hash();
        if !seen.insert(hash) {
            continue;
        }
        out.push(project(&resource, metadata));
    }
    out
}

fn project(resource: &CloudResource, metadata: &RuleMetadata) -> Value {
    let Value::Object(data) = resource.data() else {
        return resource.data().clone();
    };
    let mut projected = Map::new();
    for key in MANDATORY_IDENTITY_FIELDS.iter().chain(metadata.reported_fields.iter().map(String::as_str)) {
        if let Some(value) = data.get(*key) {
            projected.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::RuleName;
    use rce_core::model::Severity;
    use serde_json::json;

    use super::*;
    use crate::resource::AwsResource;

    fn metadata(reported_fields: &[&str]) -> RuleMetadata {
        RuleMetadata {
            rule_name: RuleName::new("r"),
            severity: Severity::High,
            standards: Default::default(),
            mitre_techniques: vec![],
            remediation: String::new(),
            reported_fields: reported_fields.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn aws(id: &str, data: Value) -> CloudResource {
        CloudResource::Aws(AwsResource {
            id: Some(id.to_string()),
            name: Some("name".to_string()),
            arn: None,
            region: "us-east-1".to_string(),
            resource_type: "aws.ec2-instance".to_string(),
            date: 1.0,
            data,
            discriminators: vec![],
        })
    }

    #[test]
    fn duplicate_resources_collapse_to_one() {
        let resources = vec![
            aws("1", json!({"id": "1", "resource_type": "aws.ec2-instance", "public_ip": "1.2.3.4"})),
            aws("1", json!({"id": "1", "resource_type": "aws.ec2-instance", "public_ip": "1.2.3.4"})),
        ];
        let projected = dedup_and_project(resources, &metadata(&["public_ip"]));
        assert_eq!(projected.len(), 1);
    }

    #[test]
    fn projection_drops_undeclared_fields() {
        let resources = vec![aws("1", json!({"id": "1", "resource_type": "aws.ec2-instance", "public_ip": "1.2.3.4", "secret": "x"}))];
        let projected = dedup_and_project(resources, &metadata(&["public_ip"]));
        let obj = projected[0].as_object().expect("object");
        assert!(obj.contains_key("public_ip"));
        assert!(obj.contains_key("id"));
        assert!(!obj.contains_key("secret"));
    }
}
