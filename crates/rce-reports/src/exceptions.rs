// crates/rce-reports/src/exceptions.rs
// ============================================================================
// Module: Exception Filtering
// Description: Partitions reconstructed resources into those matching a
// tenant's non-expired ResourceExceptions and the remainder.
// Purpose: spec.md §4.3.6.
// Dependencies: rce-core
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use rce_core::identifiers::ResourceExceptionId;
use rce_core::model::ResourceException;
use rce_core::model::Severity;

use crate::resource::CloudResource;

/// One resource matched against at least one non-expired exception.
#[derive(Debug, Clone)]
pub struct ExceptedResource {
    pub resource: CloudResource,
    pub severity: Severity,
    pub mitre_techniques: Vec<String>,
    /// The exception that matched. When more than one active exception
    /// matches, the first one found wins.
    pub exception_id: ResourceExceptionId,
}

/// `{severity -> count}` summary carried alongside an exception match set.
pub type SeverityBuckets = BTreeMap<Severity, usize>;

/// Result of [`filter_exception_resources`].
#[derive(Debug, Default)]
pub struct ExceptionFilterResult {
    pub excepted: Vec<ExceptedResource>,
    pub surviving: Vec<CloudResource>,
    pub resource_counts: SeverityBuckets,
    pub violation_counts: SeverityBuckets,
    pub mitre_counts: BTreeMap<String, usize>,
}

/// Splits `resources` (each tagged with the severity and MITRE techniques
/// of the rule that reported it) into exception matches and survivors.
///
/// A [`ResourceException`] matches a resource when every one of its
/// populated fields (`resource_id`, `location`, `resource_type`, `arn`, and
/// every `tag_filters` entry) matches the resource (spec.md §4.3.6).
#[must_use]
pub fn filter_exception_resources(
    resources: Vec<(CloudResource, Severity, Vec<String>)>,
    exceptions: &[ResourceException],
    now: DateTime<Utc>,
) -> ExceptionFilterResult {
    let active: Vec<&ResourceException> = exceptions.iter().filter(|exception| !exception.is_expired(now)).collect();

    let mut result = ExceptionFilterResult::default();
    for (resource, severity, mitre_techniques) in resources {
        if let Some(exception) = active.iter().find(|exception| matches(exception, &resource)) {
            *result.resource_counts.entry(severity).or_insert(0) += 1;
            *result.violation_counts.entry(severity).or_insert(0) += 1;
            for technique in &mitre_techniques {
                *result.mitre_counts.entry(technique.clone()).or_insert(0) += 1;
            }
            result.excepted.push(ExceptedResource { resource, severity, mitre_techniques, exception_id: exception.id.clone() });
        } else {
            result.surviving.push(resource);
        }
    }
    result
}

fn matches(exception: &ResourceException, resource: &CloudResource) -> bool {
    if let Some(id) = &exception.resource_id {
        if resource.id() != Some(id.as_str()) {
            return false;
        }
    }
    if let Some(location) = &exception.location {
        if resource.location() != location {
            return false;
        }
    }
    if let Some(resource_type) = &exception.resource_type {
        if resource.resource_type() != resource_type {
            return false;
        }
    }
    if let Some(arn) = &exception.arn {
        if resource.arn() != Some(arn.as_str()) {
            return false;
        }
    }
    exception.tag_filters.iter().all(|filter| {
        resource
            .data()
            .get("tags")
            .and_then(|tags| tags.get(&filter.key))
            .and_then(|v| v.as_str())
            .is_some_and(|v| v == filter.value)
    })
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::CustomerId;
    use rce_core::identifiers::TenantId;
    use rce_core::model::TagFilter;
    use serde_json::json;

    use super::*;
    use crate::resource::AwsResource;

    fn aws(id: &str, data: serde_json::Value) -> CloudResource {
        CloudResource::Aws(AwsResource {
            id: Some(id.to_string()),
            name: None,
            arn: None,
            region: "us-east-1".to_string(),
            resource_type: "aws.ec2-instance".to_string(),
            date: 1.0,
            data,
            discriminators: vec![],
        })
    }

    fn exception(resource_id: Option<&str>, tag_filters: Vec<TagFilter>, expiration: Option<DateTime<Utc>>) -> ResourceException {
        ResourceException::new(
            CustomerId::new("cust"),
            TenantId::new("tenant"),
            resource_id.map(str::to_string),
            None,
            None,
            None,
            tag_filters,
            expiration,
            Utc::now(),
        )
    }

    #[test]
    fn matching_resource_id_excepts_resource() {
        let exceptions = vec![exception(Some("i-1"), vec![], None)];
        let resources = vec![(aws("i-1", json!({})), Severity::High, vec![])];
        let result = filter_exception_resources(resources, &exceptions, Utc::now());
        assert_eq!(result.excepted.len(), 1);
        assert!(result.surviving.is_empty());
        assert_eq!(result.resource_counts.get(&Severity::High), Some(&1));
    }

    #[test]
    fn expired_exception_does_not_match() {
        let exceptions = vec![exception(Some("i-1"), vec![], Some(Utc::now() - chrono::Duration::days(1)))];
        let resources = vec![(aws("i-1", json!({})), Severity::High, vec![])];
        let result = filter_exception_resources(resources, &exceptions, Utc::now());
        assert!(result.excepted.is_empty());
        assert_eq!(result.surviving.len(), 1);
    }

    #[test]
    fn tag_filter_must_match_resource_tags() {
        let exceptions = vec![exception(None, vec![TagFilter { key: "env".to_string(), value: "prod".to_string() }], None)];
        let matching = vec![(aws("i-1", json!({"tags": {"env": "prod"}})), Severity::Low, vec![])];
        let non_matching = vec![(aws("i-2", json!({"tags": {"env": "dev"}})), Severity::Low, vec![])];
        assert_eq!(filter_exception_resources(matching, &exceptions, Utc::now()).excepted.len(), 1);
        assert_eq!(filter_exception_resources(non_matching, &exceptions, Utc::now()).excepted.len(), 0);
    }
}
