// crates/rce-rulesource/src/syncer.rs
// ============================================================================
// Module: Rule-Source Syncer
// Description: Orchestrates tarball pull, extraction, blame-stamping, diff,
// and sync-status tracking for one RuleSource.
// Purpose: spec.md §4.6.
// Dependencies: rce-core, crate::archive, chrono, tracing
// ============================================================================

use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use rce_core::identifiers::RuleName;
use rce_core::interfaces::GitHostClient;
use rce_core::model::LatestSync;
use rce_core::model::Rule;
use rce_core::model::RuleSource;
use rce_core::model::SyncStatus;
use thiserror::Error;
use tracing::warn;

use crate::archive::extract_rules;
use crate::archive::extract_yaml_files;
use crate::archive::read_version_files;

/// Errors that abort a sync attempt. In every case the caller has already
/// had `rule_source.latest_sync` set to `Failed` by [`sync_rule_source`]
/// before the error is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch archive: {0}")]
    Fetch(#[from] rce_core::interfaces::GitHostError),
    #[error("failed to read archive: {0}")]
    Archive(#[from] crate::archive::ArchiveError),
}

/// Result of a successful sync: rules to upsert and rule names to delete
/// from the catalog, per spec.md §4.6's diff rule.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub upserted: Vec<Rule>,
    pub deleted: Vec<RuleName>,
}

/// Runs one sync attempt for `rule_source`: pulls its tarball, extracts and
/// validates policies, stamps blame information, diffs against
/// `existing_rules`, and updates `rule_source.latest_sync` in place.
///
/// `release_tag` carries the release tag for `GITHUB_RELEASE` sources; pass
/// `None` for `GITHUB`/`GITLAB`.
///
/// # Errors
/// Returns [`SyncError`] when the archive cannot be fetched or read; in
/// that case `rule_source.latest_sync.status` is left as
/// [`SyncStatus::Failed`].
pub async fn sync_rule_source(
    rule_source: &mut RuleSource,
    git_host: &dyn GitHostClient,
    existing_rules: &[Rule],
    release_tag: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SyncOutcome, SyncError> {
    match run_sync(rule_source, git_host, existing_rules, release_tag, now).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            rule_source.latest_sync = Some(LatestSync {
                status: SyncStatus::Failed,
                release_tag: release_tag.map(ToString::to_string),
                version: None,
                timestamp: now,
            });
            Err(err)
        }
    }
}

async fn run_sync(
    rule_source: &mut RuleSource,
    git_host: &dyn GitHostClient,
    existing_rules: &[Rule],
    release_tag: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SyncOutcome, SyncError> {
    let archive_bytes = git_host
        .fetch_archive(&rule_source.project_id, &rule_source.git_ref)
        .await?;

    let yaml_files = extract_yaml_files(&archive_bytes, rule_source.prefix.as_deref())?;
    let mut synced_rules: Vec<Rule> = yaml_files
        .iter()
        .flat_map(|file| extract_rules(file, &rule_source.id))
        .collect();

    for rule in &mut synced_rules {
        match git_host
            .blame_commit(&rule_source.project_id, &rule.source_path)
            .await
        {
            Ok(blame) => {
                let updated_date = DateTime::parse_from_rfc2822(&blame.updated_date)
                    .or_else(|_| DateTime::parse_from_rfc3339(&blame.updated_date))
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(now);
                rule.stamp_blame(Some((blame.commit_hash, updated_date)));
            }
            Err(_) => {
                warn!(path = %rule.source_path, "blame information unavailable, leaving rule unstamped");
                rule.stamp_blame(None);
            }
        }
    }

    let outcome = diff_rules(existing_rules, synced_rules);

    let (version, version_custodian) = read_version_files(&archive_bytes)?;
    rule_source.latest_sync = Some(LatestSync {
        status: SyncStatus::Synced,
        release_tag: release_tag.map(ToString::to_string),
        version: version_custodian.or(version),
        timestamp: now,
    });

    Ok(outcome)
}

/// Pure diff: names present in `existing` but absent from `synced` are
/// deleted; every synced rule survives as an upsert, per spec.md §4.6.
#[must_use]
fn diff_rules(existing: &[Rule], synced: Vec<Rule>) -> SyncOutcome {
    let synced_names: BTreeSet<&str> = synced.iter().map(|rule| rule.name.as_str()).collect();
    let deleted = existing
        .iter()
        .filter(|rule| !synced_names.contains(rule.name.as_str()))
        .map(|rule| rule.name.clone())
        .collect();

    SyncOutcome {
        upserted: synced,
        deleted,
    }
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::CustomerId;
    use rce_core::identifiers::RuleSourceId;
    use rce_core::interfaces::BlameInfo;
    use rce_core::model::Cloud;
    use rce_core::model::RuleSourceType;
    use rce_core::model::Severity;

    use super::*;
    use crate::transport_memory::InMemoryGitHostClient;

    fn build_gzipped_tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .expect("append");
        }
        let tar_bytes = builder.into_inner().expect("finish tar");
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, &tar_bytes).expect("gzip write");
        encoder.finish().expect("gzip finish")
    }

    fn rule_source() -> RuleSource {
        RuleSource {
            id: RuleSourceId::new("rs-1"),
            customer_id: CustomerId::new("cust-1"),
            url: "https://github.com/acme/rules".to_string(),
            project_id: "acme/rules".to_string(),
            git_ref: "main".to_string(),
            prefix: None,
            source_type: RuleSourceType::Github,
            latest_sync: None,
            description: None,
            secret_handle: None,
        }
    }

    fn existing_rule(name: &str, rule_source_id: &RuleSourceId) -> Rule {
        Rule {
            name: RuleName::new(name),
            rule_source_id: rule_source_id.clone(),
            cloud: Cloud::Aws,
            resource_type: "aws.s3-bucket".to_string(),
            severity: Severity::Low,
            description: String::new(),
            remediation: String::new(),
            impact: String::new(),
            standards: Default::default(),
            mitre_techniques: Vec::new(),
            article: None,
            service_section: None,
            commit_hash: None,
            updated_date: None,
            source_path: "policies/old.yaml".to_string(),
            global: false,
        }
    }

    #[tokio::test]
    async fn successful_sync_upserts_and_marks_synced() {
        let yaml = "policies:\n  - name: rule-a\n    cloud: AWS\n    resource_type: aws.s3-bucket\n";
        let archive = build_gzipped_tarball(&[("policies/a.yaml", yaml), ("version", "1.2.3\n")]);

        let git_host = InMemoryGitHostClient::new();
        git_host.set_archive("acme/rules", "main", archive).await;
        git_host
            .set_blame(
                "acme/rules",
                "policies/a.yaml",
                BlameInfo {
                    commit_hash: "abc123".to_string(),
                    updated_date: "2026-01-01T00:00:00Z".to_string(),
                },
            )
            .await;

        let mut source = rule_source();
        let outcome = sync_rule_source(&mut source, &git_host, &[], None, Utc::now())
            .await
            .expect("sync");

        assert_eq!(outcome.upserted.len(), 1);
        assert_eq!(outcome.upserted[0].commit_hash.as_deref(), Some("abc123"));
        assert!(outcome.deleted.is_empty());
        let latest_sync = source.latest_sync.expect("latest_sync set");
        assert_eq!(latest_sync.status, SyncStatus::Synced);
        assert_eq!(latest_sync.version.as_deref(), Some("1.2.3"));
    }

    #[tokio::test]
    async fn missing_rule_is_deleted() {
        let yaml = "policies:\n  - name: rule-a\n    cloud: AWS\n    resource_type: aws.s3-bucket\n";
        let archive = build_gzipped_tarball(&[("policies/a.yaml", yaml)]);
        let git_host = InMemoryGitHostClient::new();
        git_host.set_archive("acme/rules", "main", archive).await;

        let mut source = rule_source();
        let existing = vec![existing_rule("rule-b", &source.id)];
        let outcome = sync_rule_source(&mut source, &git_host, &existing, None, Utc::now())
            .await
            .expect("sync");

        assert_eq!(outcome.upserted.len(), 1);
        assert_eq!(outcome.deleted, vec![RuleName::new("rule-b")]);
    }

    #[tokio::test]
    async fn fetch_failure_marks_source_failed() {
        let git_host = InMemoryGitHostClient::new();
        let mut source = rule_source();
        let result = sync_rule_source(&mut source, &git_host, &[], None, Utc::now()).await;

        assert!(result.is_err());
        assert_eq!(
            source.latest_sync.expect("latest_sync set").status,
            SyncStatus::Failed
        );
    }
}
