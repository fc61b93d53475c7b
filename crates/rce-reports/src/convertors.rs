// crates/rce-reports/src/convertors.rs
// ============================================================================
// Module: SIEM Convertors
// Description: Converts one rule's (region, resources) group into the
// DefectDojo Generic Findings shape, the Cloud Custodian Scan shape, and
// UDM events/entities for Chronicle.
// Purpose: spec.md §4.3.8.
// Dependencies: rce-core, serde_json, base64
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::DateTime;
use chrono::Utc;
use rce_core::model::Rule;
use rce_core::model::Severity;
use rce_core::model::StandardsRefs;
use serde::Serialize;
use serde_json::Value;

/// `UNKNOWN -> MEDIUM`; every other severity passes through unchanged
/// (spec.md §4.3.8).
#[must_use]
pub fn to_dojo_severity(severity: Severity) -> Severity {
    if severity == Severity::Unknown {
        Severity::Medium
    } else {
        severity
    }
}

/// How a Generic Findings finding carries its resource list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachmentMode {
    /// Rendered as a markdown table inline in the description.
    #[default]
    Inline,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DojoFile {
    pub title: String,
    /// Base64-encoded file content, as DefectDojo's API expects.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DojoFinding {
    pub title: String,
    pub date: DateTime<Utc>,
    pub severity: Severity,
    pub description: String,
    pub mitigation: String,
    pub impact: String,
    pub references: String,
    pub tags: Vec<String>,
    pub vuln_id_from_tool: String,
    pub service: Option<String>,
    pub files: Vec<DojoFile>,
}

/// Builds one Generic Findings finding for `rule`'s violations in `region`.
/// Returns `None` when `resources` is empty: an empty group produces no
/// finding, matching the source's `if not resources: continue`.
#[must_use]
pub fn generic_dojo_finding(rule: &Rule, region: &str, resources: &[Value], attachment: AttachmentMode, sync_date: DateTime<Utc>) -> Option<DojoFinding> {
    if resources.is_empty() {
        return None;
    }

    let mut tags = vec![region.to_string(), rule.resource_type.clone()];
    if let Some(service_section) = &rule.service_section {
        tags.push(service_section.clone());
    }

    let article = rule.article.clone().unwrap_or_default();
    let (description, files) = match attachment {
        AttachmentMode::Inline => (format!("{article}\n{}", markdown_table(resources)), Vec::new()),
        AttachmentMode::Json => (article, vec![DojoFile { title: format!("{}.json", rule.name), data: json_attachment(resources) }]),
        AttachmentMode::Csv => (article, vec![DojoFile { title: format!("{}.csv", rule.name), data: csv_attachment(resources) }]),
    };

    Some(DojoFinding {
        title: rule.description.clone(),
        date: sync_date,
        severity: to_dojo_severity(rule.severity),
        description,
        mitigation: rule.remediation.clone(),
        impact: rule.impact.clone(),
        references: make_references(&rule.standards),
        tags,
        vuln_id_from_tool: rule.name.to_string(),
        service: rule.service_section.clone(),
        files,
    })
}

fn make_references(standards: &StandardsRefs) -> String {
    let mut out = String::from("#### Standards\n");
    for (name, versions) in standards {
        for version in versions.keys() {
            out.push_str(&format!("* {name} **{version}**\n"));
        }
    }
    out
}

fn markdown_table(resources: &[Value]) -> String {
    let headers = identity_headers(resources);
    let mut out = String::from("| # | ");
    out.push_str(&headers.join(" | "));
    out.push_str(" |\n|---|");
    out.push_str(&"---|".repeat(headers.len()));
    out.push('\n');
    for (i, resource) in resources.iter().enumerate() {
        out.push_str(&format!("| {} | ", i + 1));
        let cells: Vec<String> = headers.iter().map(|h| resource.get(h).and_then(Value::as_str).unwrap_or("-").to_string()).collect();
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
    }
    out
}

fn identity_headers(resources: &[Value]) -> Vec<&'static str> {
    let Some(first) = resources.first() else {
        return vec!["id", "name"];
    };
    if first.get("arn").is_some() {
        vec!["arn", "id", "name"]
    } else if first.get("urn").is_some() {
        vec!["urn", "id", "name"]
    } else if first.get("namespace").is_some() {
        vec!["namespace", "id", "name"]
    } else {
        vec!["id", "name"]
    }
}

fn json_attachment(resources: &[Value]) -> String {
    BASE64.encode(serde_json::to_vec(resources).unwrap_or_default())
}

fn csv_attachment(resources: &[Value]) -> String {
    let mut csv = String::from("#,Arn,Id,Name,Namespace\n");
    for (i, resource) in resources.iter().enumerate() {
        let field = |key: &str| resource.get(key).and_then(Value::as_str).unwrap_or("").to_string();
        csv.push_str(&format!("{},{},{},{},{}\n", i + 1, field("arn"), field("id"), field("name"), field("namespace")));
    }
    BASE64.encode(csv.into_bytes())
}

/// One Cloud Custodian Scan item: one rule/region group (or one per
/// resource, when `resource_per_finding` is set by the caller building the
/// full report).
#[derive(Debug, Clone, PartialEq)]
pub struct CloudCustodianItem {
    pub description: String,
    pub remediation: String,
    pub impact: String,
    pub standard: BTreeMap<String, Vec<String>>,
    pub severity: Severity,
    pub article: Option<String>,
    pub service: Option<String>,
    pub vuln_id_from_tool: String,
    pub tags: Vec<String>,
    pub resources: Vec<Value>,
}

#[must_use]
pub fn cloud_custodian_item(rule: &Rule, region: &str, resources: &[Value]) -> CloudCustodianItem {
    CloudCustodianItem {
        description: rule.description.clone(),
        remediation: rule.remediation.clone(),
        impact: rule.impact.clone(),
        standard: convert_standards(&rule.standards),
        severity: to_dojo_severity(rule.severity),
        article: rule.article.clone(),
        service: rule.service_section.clone(),
        vuln_id_from_tool: rule.name.to_string(),
        tags: vec![region.to_string()],
        resources: resources.to_vec(),
    }
}

fn convert_standards(standards: &StandardsRefs) -> BTreeMap<String, Vec<String>> {
    standards.iter().map(|(name, versions)| (name.clone(), versions.keys().cloned().collect())).collect()
}

/// One UDM event for Chronicle (`udm events` per spec.md §4.3.8).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdmEvent {
    pub event_type: &'static str,
    pub rule_name: String,
    pub severity: Severity,
    pub region: String,
    pub resource: Value,
}

#[must_use]
pub fn udm_events(rule: &Rule, region: &str, resources: &[Value]) -> Vec<UdmEvent> {
    resources
        .iter()
        .map(|resource| UdmEvent {
            event_type: "GENERIC_EVENT",
            rule_name: rule.name.to_string(),
            severity: rule.severity,
            region: region.to_string(),
            resource: resource.clone(),
        })
        .collect()
}

/// One UDM entity for Chronicle (`udm entities` per spec.md §4.3.8).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdmEntity {
    pub entity_type: &'static str,
    pub resource_type: String,
    pub region: String,
    pub resource: Value,
}

#[must_use]
pub fn udm_entities(rule: &Rule, region: &str, resources: &[Value]) -> Vec<UdmEntity> {
    resources
        .iter()
        .map(|resource| UdmEntity {
            entity_type: "RESOURCE",
            resource_type: rule.resource_type.clone(),
            region: region.to_string(),
            resource: resource.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::RuleName;
    use rce_core::identifiers::RuleSourceId;
    use rce_core::model::Cloud;
    use serde_json::json;

    use super::*;

    fn rule() -> Rule {
        Rule {
            name: RuleName::new("ec2-public"),
            rule_source_id: RuleSourceId::new("src"),
            cloud: Cloud::Aws,
            resource_type: "aws.ec2-instance".to_string(),
            severity: Severity::Unknown,
            description: "EC2 is public".to_string(),
            remediation: "restrict sg".to_string(),
            impact: "data exposure".to_string(),
            standards: BTreeMap::from([("cis-aws".to_string(), BTreeMap::from([("1.0".to_string(), vec!["1.1".to_string()])]))]),
            mitre_techniques: vec![],
            article: Some("public ec2 instances are risky".to_string()),
            service_section: Some("compute".to_string()),
            commit_hash: None,
            updated_date: None,
            source_path: String::new(),
            global: false,
        }
    }

    #[test]
    fn unknown_severity_maps_to_medium() {
        assert_eq!(to_dojo_severity(Severity::Unknown), Severity::Medium);
        assert_eq!(to_dojo_severity(Severity::High), Severity::High);
    }

    #[test]
    fn empty_resources_produce_no_finding() {
        assert!(generic_dojo_finding(&rule(), "us-east-1", &[], AttachmentMode::Inline, Utc::now()).is_none());
    }

    #[test]
    fn generic_finding_carries_dojo_severity_and_tags() {
        let resources = vec![json!({"id": "i-1", "name": "web"})];
        let finding = generic_dojo_finding(&rule(), "us-east-1", &resources, AttachmentMode::Inline, Utc::now()).expect("finding");
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.tags, vec!["us-east-1".to_string(), "aws.ec2-instance".to_string(), "compute".to_string()]);
        assert!(finding.description.contains("web") || finding.description.contains("i-1"));
    }

    #[test]
    fn json_attachment_mode_produces_one_base64_file() {
        let resources = vec![json!({"id": "i-1", "name": "web"})];
        let finding = generic_dojo_finding(&rule(), "us-east-1", &resources, AttachmentMode::Json, Utc::now()).expect("finding");
        assert_eq!(finding.files.len(), 1);
        assert_eq!(finding.files[0].title, "ec2-public.json");
    }

    #[test]
    fn cloud_custodian_item_carries_standards_and_resources() {
        let resources = vec![json!({"id": "i-1"})];
        let item = cloud_custodian_item(&rule(), "us-east-1", &resources);
        assert_eq!(item.standard.get("cis-aws"), Some(&vec!["1.0".to_string()]));
        assert_eq!(item.resources.len(), 1);
    }

    #[test]
    fn udm_events_one_per_resource() {
        let resources = vec![json!({"id": "i-1"}), json!({"id": "i-2"})];
        assert_eq!(udm_events(&rule(), "us-east-1", &resources).len(), 2);
    }
}
