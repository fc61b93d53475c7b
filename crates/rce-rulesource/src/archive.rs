// crates/rce-rulesource/src/archive.rs
// ============================================================================
// Module: Tarball Walk & Policy Extraction
// Description: Unpacks a rule-source tarball in memory and extracts/parses
// YAML policy documents.
// Purpose: spec.md §4.6 "walk for *.yaml/*.yml, extract the policies: list
// from each, validate each policy against the Rule schema".
// Dependencies: tar, flate2, serde_yaml, rce-core
// ============================================================================

use std::io::Read;

use rce_core::identifiers::RuleName;
use rce_core::identifiers::RuleSourceId;
use rce_core::model::Cloud;
use rce_core::model::Rule;
use rce_core::model::Severity;
use rce_core::model::StandardsRefs;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Errors walking or parsing a rule-source archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to decompress archive: {0}")]
    Gzip(String),
    #[error("malformed tar entry: {0}")]
    Tar(String),
}

/// One `*.yaml`/`*.yml` file extracted from the archive, keyed by its path
/// within the tarball (becomes `Rule::source_path`).
#[derive(Debug, Clone)]
pub struct YamlFile {
    pub path: String,
    pub contents: String,
}

/// Decompresses and walks `archive_bytes` (a gzipped tarball), returning
/// every `*.yaml`/`*.yml` entry. Entries under `prefix` (if set) only.
///
/// # Errors
/// Returns [`ArchiveError::Gzip`] if the stream is not valid gzip,
/// [`ArchiveError::Tar`] if the tar structure is malformed.
pub fn extract_yaml_files(archive_bytes: &[u8], prefix: Option<&str>) -> Result<Vec<YamlFile>, ArchiveError> {
    let decoder = flate2::read::GzDecoder::new(archive_bytes);
    let mut tar = tar::Archive::new(decoder);
    let mut files = Vec::new();

    let entries = tar.entries().map_err(|err| ArchiveError::Tar(err.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| ArchiveError::Tar(err.to_string()))?;
        let path = entry
            .path()
            .map_err(|err| ArchiveError::Tar(err.to_string()))?
            .to_string_lossy()
            .to_string();

        if !(path.ends_with(".yaml") || path.ends_with(".yml")) {
            continue;
        }
        if let Some(prefix) = prefix {
            if !path.contains(prefix) {
                continue;
            }
        }

        let mut contents = String::new();
        if entry.read_to_string(&mut contents).is_err() {
            warn!(path, "skipping non-UTF8 policy file");
            continue;
        }
        files.push(YamlFile { path, contents });
    }
    Ok(files)
}

/// Raw shape of one entry in a policy file's `policies:` list, matching the
/// original source-of-truth fields before they are typed and stamped into a
/// [`Rule`].
#[derive(Debug, Clone, Deserialize)]
struct RawPolicy {
    name: String,
    cloud: Cloud,
    resource_type: String,
    #[serde(default = "default_severity")]
    severity: Severity,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remediation: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    standards: StandardsRefs,
    #[serde(default)]
    mitre_techniques: Vec<String>,
    article: Option<String>,
    service_section: Option<String>,
    #[serde(default)]
    global: bool,
}

fn default_severity() -> Severity {
    Severity::Unknown
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    policies: Vec<RawPolicy>,
}

/// Parses the `policies:` list out of one YAML document's contents.
/// Documents with no `policies:` key parse as an empty list rather than an
/// error, since not every YAML file in a rule-source tree need be a policy
/// file.
///
/// # Errors
/// Returns [`ArchiveError::Tar`] reused as a generic parse-failure carrier
/// when the document is not valid YAML at all (distinct from an invalid
/// individual policy, which is tolerated by [`validate_policy`]).
fn parse_policy_document(yaml: &str) -> Result<Vec<RawPolicy>, ArchiveError> {
    let document: PolicyDocument =
        serde_yaml::from_str(yaml).map_err(|err| ArchiveError::Tar(err.to_string()))?;
    Ok(document.policies)
}

/// Parses and validates every policy in `file` against the `Rule` schema.
/// Invalid individual policies are logged and skipped, not propagated,
/// matching spec.md §4.6's "invalid policies are logged and skipped".
/// Returns an empty vec (not an error) when the file is not a policy
/// document at all or fails to parse as YAML.
#[must_use]
pub fn extract_rules(file: &YamlFile, rule_source_id: &RuleSourceId) -> Vec<Rule> {
    let raw_policies = match parse_policy_document(&file.contents) {
        Ok(policies) => policies,
        Err(err) => {
            warn!(path = %file.path, error = %err, "skipping unparseable policy file");
            return Vec::new();
        }
    };

    raw_policies
        .into_iter()
        .filter_map(|raw| match validate_policy(raw, rule_source_id, &file.path) {
            Ok(rule) => Some(rule),
            Err(reason) => {
                warn!(path = %file.path, reason, "skipping invalid policy");
                None
            }
        })
        .collect()
}

fn validate_policy(raw: RawPolicy, rule_source_id: &RuleSourceId, source_path: &str) -> Result<Rule, String> {
    if raw.name.trim().is_empty() {
        return Err("policy name is empty".to_string());
    }
    if raw.resource_type.trim().is_empty() {
        return Err("policy resource_type is empty".to_string());
    }

    Ok(Rule {
        name: RuleName::new(raw.name),
        rule_source_id: rule_source_id.clone(),
        cloud: raw.cloud,
        resource_type: raw.resource_type,
        severity: raw.severity,
        description: raw.description,
        remediation: raw.remediation,
        impact: raw.impact,
        standards: raw.standards,
        mitre_techniques: raw.mitre_techniques,
        article: raw.article,
        service_section: raw.service_section,
        commit_hash: None,
        updated_date: None,
        source_path: source_path.to_string(),
        global: raw.global,
    })
}

/// Reads `version` and `version-custodian` files at the archive root, used
/// to stamp `latest_sync.version` on a successful sync (spec.md §4.6).
/// Absent files yield `None` rather than an error.
///
/// # Errors
/// Returns [`ArchiveError::Gzip`]/[`ArchiveError::Tar`] on a malformed
/// archive, same as [`extract_yaml_files`].
pub fn read_version_files(archive_bytes: &[u8]) -> Result<(Option<String>, Option<String>), ArchiveError> {
    let decoder = flate2::read::GzDecoder::new(archive_bytes);
    let mut tar = tar::Archive::new(decoder);
    let mut version = None;
    let mut version_custodian = None;

    let entries = tar.entries().map_err(|err| ArchiveError::Tar(err.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| ArchiveError::Tar(err.to_string()))?;
        let path = entry
            .path()
            .map_err(|err| ArchiveError::Tar(err.to_string()))?
            .to_string_lossy()
            .to_string();
        let file_name = path.rsplit('/').next().unwrap_or(&path);

        if file_name == "version" || file_name == "version-custodian" {
            let mut contents = String::new();
            if entry.read_to_string(&mut contents).is_err() {
                continue;
            }
            let trimmed = contents.trim().to_string();
            if file_name == "version" {
                version = Some(trimmed);
            } else {
                version_custodian = Some(trimmed);
            }
        }
    }
    Ok((version, version_custodian))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_source_id() -> RuleSourceId {
        RuleSourceId::new("rs-1")
    }

    #[test]
    fn parses_policies_list() {
        let yaml = r#"
policies:
  - name: s3-bucket-public-read-prohibited
    cloud: AWS
    resource_type: aws.s3-bucket
    severity: HIGH
    description: Buckets must not allow public read.
    remediation: Remove public grants.
    impact: Data exposure.
"#;
        let file = YamlFile {
            path: "policies/s3.yaml".to_string(),
            contents: yaml.to_string(),
        };
        let rules = extract_rules(&file, &rule_source_id());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name.as_str(), "s3-bucket-public-read-prohibited");
        assert_eq!(rules[0].severity, Severity::High);
        assert_eq!(rules[0].source_path, "policies/s3.yaml");
    }

    #[test]
    fn invalid_policy_is_skipped_not_errored() {
        let yaml = r#"
policies:
  - name: ""
    cloud: AWS
    resource_type: aws.s3-bucket
  - name: valid-rule
    cloud: AWS
    resource_type: aws.s3-bucket
"#;
        let file = YamlFile {
            path: "policies/mixed.yaml".to_string(),
            contents: yaml.to_string(),
        };
        let rules = extract_rules(&file, &rule_source_id());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name.as_str(), "valid-rule");
    }

    #[test]
    fn non_policy_yaml_yields_no_rules() {
        let file = YamlFile {
            path: "README.yaml".to_string(),
            contents: "title: not a policy file\n".to_string(),
        };
        assert!(extract_rules(&file, &rule_source_id()).is_empty());
    }
}
