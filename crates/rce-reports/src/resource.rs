// crates/rce-reports/src/resource.rs
// ============================================================================
// Module: CloudResource
// Description: Typed reconstruction of one scanned resource out of a
// ShardPart's opaque JSON payload, plus the per-resource-type relocation
// rules applied before any report is derived.
// Purpose: spec.md §4.3.1 Resource Model, §4.3.2 Custom Per-Resource-Type
// Modifications.
// Dependencies: rce-core, serde_json, sha2
// ============================================================================

use rce_core::model::Rule;
use rce_core::model::ShardPart;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::error::ReportsError;

/// Synthetic region used for resources that are not bound to a single
/// region: multi-region CloudTrail trails and rules flagged `global`.
pub const MULTIREGION: &str = "multiregion";

/// AWS resource types that are disambiguated across regions by
/// synthesizing the region into their discriminators (spec.md §4.3.2).
const REGION_DISCRIMINATED_AWS_TYPES: &[&str] = &["aws.glue-catalog", "aws.account"];

/// One reconstructed resource, frozen once built: no method on this type
/// mutates a field after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudResource {
    Aws(AwsResource),
    Azure(AzureResource),
    Google(GoogleResource),
    Kubernetes(K8sResource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AwsResource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arn: Option<String>,
    pub region: String,
    pub resource_type: String,
    pub date: f64,
    pub data: Value,
    pub discriminators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AzureResource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: String,
    pub resource_type: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleResource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub urn: Option<String>,
    pub location: String,
    pub resource_type: String,
    pub data: Value,
    pub discriminators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct K8sResource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub resource_type: String,
    pub data: Value,
}

impl CloudResource {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Aws(r) => r.id.as_deref(),
            Self::Azure(r) => r.id.as_deref(),
            Self::Google(r) => r.id.as_deref(),
            Self::Kubernetes(r) => r.id.as_deref(),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Aws(r) => r.name.as_deref(),
            Self::Azure(r) => r.name.as_deref(),
            Self::Google(r) => r.name.as_deref(),
            Self::Kubernetes(r) => r.name.as_deref(),
        }
    }

    #[must_use]
    pub fn arn(&self) -> Option<&str> {
        match self {
            Self::Aws(r) => r.arn.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Aws(r) => &r.region,
            Self::Azure(r) => &r.location,
            Self::Google(r) => &r.location,
            Self::Kubernetes(r) => r.namespace.as_deref().unwrap_or(""),
        }
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        match self {
            Self::Aws(r) => &r.resource_type,
            Self::Azure(r) => &r.resource_type,
            Self::Google(r) => &r.resource_type,
            Self::Kubernetes(r) => &r.resource_type,
        }
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        match self {
            Self::Aws(r) => &r.data,
            Self::Azure(r) => &r.data,
            Self::Google(r) => &r.data,
            Self::Kubernetes(r) => &r.data,
        }
    }

    /// Stable hex digest of everything that constitutes identity: the
    /// exposed attributes plus `discriminators`. Used for dedup (§4.3.3)
    /// and set-difference diffing (§4.3.4).
    #[must_use]
    pub fn identity_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.resource_type().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.id().unwrap_or_default().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.name().unwrap_or_default().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.arn().unwrap_or_default().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.location().as_bytes());
        if let Self::Aws(r) = self {
            for d in &r.discriminators {
                hasher.update(b"\0");
                hasher.update(d.as_bytes());
            }
        }
        if let Self::Google(r) = self {
            for d in &r.discriminators {
                hasher.update(b"\0");
                hasher.update(d.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Reconstructs every resource held in `part.resources`, applying the
/// per-resource-type relocations of spec.md §4.3.2. Returns `(region,
/// resource)` pairs: the region may differ from `part.location` when a
/// resource is relocated to [`MULTIREGION`].
///
/// # Errors
/// Returns [`ReportsError::MalformedResource`] when an entry is not a JSON
/// object.
pub fn reconstruct_part(
    cloud: rce_core::model::Cloud,
    rule: &Rule,
    part: &ShardPart,
) -> Result<Vec<(String, CloudResource)>, ReportsError> {
    use rce_core::model::Cloud as C;

    let mut out = Vec::with_capacity(part.resources.len());
    for data in &part.resources {
        if !data.is_object() {
            return Err(ReportsError::MalformedResource(format!("{} resource is not a JSON object", part.policy_name)));
        }
        let resource = match cloud {
            C::Aws => build_aws(part, data),
            C::Azure => build_azure(part, data),
            C::Google => build_google(part, data),
            C::Kubernetes => build_k8s(data),
        };
        let region = effective_region(rule, part, &resource);
        out.push((region, resource));
    }
    Ok(out)
}

/// Builds the typed resource for one shard entry without applying any
/// rule-dependent relocation. Used where only a resource's identity is
/// needed, independent of the region it is ultimately reported under.
#[must_use]
pub fn build_resource(cloud: rce_core::model::Cloud, part: &ShardPart, data: &Value) -> CloudResource {
    use rce_core::model::Cloud as C;

    match cloud {
        C::Aws => build_aws(part, data),
        C::Azure => build_azure(part, data),
        C::Google => build_google(part, data),
        C::Kubernetes => build_k8s(data),
    }
}

fn build_aws(part: &ShardPart, data: &Value) -> CloudResource {
    let resource_type = str_field(data, "resource_type").unwrap_or_else(|| part.policy_name.clone());
    let mut discriminators = Vec::new();
    if REGION_DISCRIMINATED_AWS_TYPES.contains(&resource_type.as_str()) {
        discriminators.push(part.location.clone());
    }
    CloudResource::Aws(AwsResource {
        id: str_field(data, "id"),
        name: str_field(data, "name"),
        arn: str_field(data, "arn"),
        region: part.location.clone(),
        resource_type,
        date: part.timestamp,
        data: data.clone(),
        discriminators,
    })
}

fn build_azure(part: &ShardPart, data: &Value) -> CloudResource {
    CloudResource::Azure(AzureResource {
        id: str_field(data, "id"),
        name: str_field(data, "name"),
        location: str_field(data, "location").unwrap_or_else(|| part.location.clone()),
        resource_type: str_field(data, "resource_type").unwrap_or_else(|| part.policy_name.clone()),
        data: data.clone(),
    })
}

fn build_google(part: &ShardPart, data: &Value) -> CloudResource {
    CloudResource::Google(GoogleResource {
        id: str_field(data, "id"),
        name: str_field(data, "name"),
        urn: str_field(data, "urn"),
        location: str_field(data, "location").unwrap_or_else(|| part.location.clone()),
        resource_type: str_field(data, "resource_type").unwrap_or_else(|| part.policy_name.clone()),
        data: data.clone(),
        discriminators: Vec::new(),
    })
}

fn build_k8s(data: &Value) -> CloudResource {
    CloudResource::Kubernetes(K8sResource {
        id: str_field(data, "id"),
        name: str_field(data, "name"),
        namespace: str_field(data, "namespace"),
        resource_type: str_field(data, "resource_type").unwrap_or_default(),
        data: data.clone(),
    })
}

/// Determines the region a resource should be reported under, applying
/// the two unconditional relocation rules of spec.md §4.3.2: a rule
/// flagged `global` always relocates, and an `aws.cloudtrail` resource
/// with `IsMultiRegionTrail=true` relocates regardless of the rule.
fn effective_region(rule: &Rule, part: &ShardPart, resource: &CloudResource) -> String {
    if rule.global {
        return MULTIREGION.to_string();
    }
    if resource.resource_type() == "aws.cloudtrail" {
        let is_multiregion = resource.data().get("IsMultiRegionTrail").and_then(Value::as_bool).unwrap_or(false);
        if is_multiregion {
            return MULTIREGION.to_string();
        }
    }
    part.location.clone()
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::RuleName;
    use rce_core::identifiers::RuleSourceId;
    use rce_core::model::Cloud;
    use rce_core::model::Severity;
    use serde_json::json;

    use super::*;

    fn rule(global: bool) -> Rule {
        Rule {
            name: RuleName::new("r"),
            rule_source_id: RuleSourceId::new("src"),
            cloud: Cloud::Aws,
            resource_type: "aws.cloudtrail".to_string(),
            severity: Severity::High,
            description: String::new(),
            remediation: String::new(),
            impact: String::new(),
            standards: Default::default(),
            mitre_techniques: vec![],
            article: None,
            service_section: None,
            commit_hash: None,
            updated_date: None,
            source_path: String::new(),
            global,
        }
    }

    fn part(resources: Vec<Value>) -> ShardPart {
        ShardPart::new("cloudtrail-enabled", "us-east-1", 1.0, resources)
    }

    #[test]
    fn global_rule_relocates_to_multiregion() {
        let part = part(vec![json!({"id": "1", "resource_type": "aws.cloudtrail"})]);
        let reconstructed = reconstruct_part(Cloud::Aws, &rule(true), &part).expect("ok");
        assert_eq!(reconstructed[0].0, MULTIREGION);
    }

    #[test]
    fn multiregion_trail_relocates_even_for_non_global_rule() {
        let part = part(vec![json!({"id": "1", "resource_type": "aws.cloudtrail", "IsMultiRegionTrail": true})]);
        let reconstructed = reconstruct_part(Cloud::Aws, &rule(false), &part).expect("ok");
        assert_eq!(reconstructed[0].0, MULTIREGION);
    }

    #[test]
    fn ordinary_resource_keeps_part_region() {
        let part = part(vec![json!({"id": "1", "resource_type": "aws.ec2-instance"})]);
        let reconstructed = reconstruct_part(Cloud::Aws, &rule(false), &part).expect("ok");
        assert_eq!(reconstructed[0].0, "us-east-1");
    }

    #[test]
    fn glue_catalog_gets_region_discriminator() {
        let part = part(vec![json!({"id": "1", "resource_type": "aws.glue-catalog"})]);
        let reconstructed = reconstruct_part(Cloud::Aws, &rule(false), &part).expect("ok");
        match &reconstructed[0].1 {
            CloudResource::Aws(r) => assert_eq!(r.discriminators, vec!["us-east-1".to_string()]),
            _ => panic!("expected aws resource"),
        }
    }

    #[test]
    fn identity_hash_is_stable_for_equal_resources() {
        let part = part(vec![json!({"id": "1", "name": "a", "resource_type": "aws.ec2-instance"})]);
        let a = reconstruct_part(Cloud::Aws, &rule(false), &part).expect("ok");
        let b = reconstruct_part(Cloud::Aws, &rule(false), &part).expect("ok");
        assert_eq!(a[0].1.identity_hash(), b[0].1.identity_hash());
    }

    #[test]
    fn malformed_resource_errors() {
        let part = part(vec![json!("not-an-object")]);
        assert!(reconstruct_part(Cloud::Aws, &rule(false), &part).is_err());
    }
}
