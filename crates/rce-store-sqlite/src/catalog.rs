// crates/rce-store-sqlite/src/catalog.rs
// ============================================================================
// Module: Read-Mostly Catalog Repositories
// Description: CRUD over Rule, Ruleset, and RuleMetadata — the entities the
// rule-source syncer and license sync populate and the report pipeline
// reads, split from the mutable-lifecycle store per SPEC_FULL §3.
// Purpose: Durable persistence for spec.md §3's catalog-shaped entities.
// Dependencies: rusqlite, serde_json, rce-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rce_core::identifiers::CustomerId;
use rce_core::identifiers::RuleName;
use rce_core::identifiers::RuleSourceId;
use rce_core::identifiers::RulesetName;
use rce_core::model::Rule;
use rce_core::model::RuleMetadata;
use rce_core::model::Ruleset;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

fn lock(connection: &Arc<Mutex<Connection>>) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
    connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
}

/// Repository for [`Rule`] catalog entries, keyed by `(name,
/// rule_source_id)` per [`Rule::identity`].
#[derive(Clone)]
pub struct RuleRepository {
    connection: Arc<Mutex<Connection>>,
}

impl RuleRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, rule: &Rule) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(rule).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO rules (name, rule_source_id, json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name, rule_source_id) DO UPDATE SET json = excluded.json",
                params![rule.name.as_str(), rule.rule_source_id.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Applies a rule-source sync diff in one transaction: upserts
    /// survivors, deletes names gone from the source.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn apply_diff(&self, rule_source_id: &RuleSourceId, upserted: &[Rule], deleted: &[RuleName]) -> Result<(), SqliteStoreError> {
        let mut guard = lock(&self.connection)?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        for rule in upserted {
            let json = serde_json::to_vec(rule).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            tx.execute(
                "INSERT INTO rules (name, rule_source_id, json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name, rule_source_id) DO UPDATE SET json = excluded.json",
                params![rule.name.as_str(), rule.rule_source_id.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        for name in deleted {
            tx.execute(
                "DELETE FROM rules WHERE name = ?1 AND rule_source_id = ?2",
                params![name.as_str(), rule_source_id.as_str()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, name: &RuleName, rule_source_id: &RuleSourceId) -> Result<Option<Rule>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT json FROM rules WHERE name = ?1 AND rule_source_id = ?2",
                params![name.as_str(), rule_source_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_for_source(&self, rule_source_id: &RuleSourceId) -> Result<Vec<Rule>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM rules WHERE rule_source_id = ?1")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![rule_source_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .collect()
    }
}

/// Repository for [`Ruleset`] records, keyed by `(customer_id, name,
/// version)`.
#[derive(Clone)]
pub struct RulesetRepository {
    connection: Arc<Mutex<Connection>>,
}

impl RulesetRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, ruleset: &Ruleset) -> Result<(), SqliteStoreError> {
        ruleset.validate().map_err(SqliteStoreError::Invalid)?;
        let json = serde_json::to_vec(ruleset).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO rulesets (customer_id, name, version, json) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(customer_id, name, version) DO UPDATE SET json = excluded.json",
                params![
                    ruleset.customer_id.as_str(),
                    ruleset.name.as_str(),
                    ruleset.version.as_str(),
                    json
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, customer_id: &CustomerId, name: &RulesetName, version: &str) -> Result<Option<Ruleset>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT json FROM rulesets WHERE customer_id = ?1 AND name = ?2 AND version = ?3",
                params![customer_id.as_str(), name.as_str(), version],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// All rulesets owned by a customer, across names and versions.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<Ruleset>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM rulesets WHERE customer_id = ?1")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![customer_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .collect()
    }
}

/// Repository for [`RuleMetadata`] records, keyed by rule name.
#[derive(Clone)]
pub struct RuleMetadataRepository {
    connection: Arc<Mutex<Connection>>,
}

impl RuleMetadataRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, metadata: &RuleMetadata) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(metadata).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO rule_metadata (rule_name, json) VALUES (?1, ?2)
                 ON CONFLICT(rule_name) DO UPDATE SET json = excluded.json",
                params![metadata.rule_name.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, rule_name: &RuleName) -> Result<Option<RuleMetadata>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT json FROM rule_metadata WHERE rule_name = ?1",
                params![rule_name.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_all(&self) -> Result<Vec<RuleMetadata>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM rule_metadata")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use rce_core::identifiers::RulesetVersion;
    use rce_core::model::tenant::Cloud;

    use super::*;
    use crate::connection;

    fn open() -> Arc<Mutex<Connection>> {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = connection::SqliteStoreConfig::new(dir.path().join("store.db"));
        let conn = connection::open(&config).expect("open");
        std::mem::forget(dir);
        Arc::new(Mutex::new(conn))
    }

    fn sample_rule(name: &str, source: &str) -> Rule {
        Rule {
            name: RuleName::new(name),
            rule_source_id: RuleSourceId::new(source),
            cloud: Cloud::Aws,
            resource_type: "aws.s3.bucket".to_string(),
            severity: rce_core::model::Severity::High,
            description: "desc".to_string(),
            remediation: "fix it".to_string(),
            impact: "impact".to_string(),
            standards: Default::default(),
            mitre_techniques: vec![],
            article: None,
            service_section: None,
            commit_hash: None,
            updated_date: None,
            source_path: "rules/s3.yaml".to_string(),
            global: false,
        }
    }

    #[test]
    fn rule_apply_diff_upserts_and_deletes() {
        let repo = RuleRepository::new(open());
        let source = RuleSourceId::new("source-1");
        let kept = sample_rule("rule-a", "source-1");
        let removed = sample_rule("rule-b", "source-1");
        repo.upsert(&kept).expect("seed upsert");
        repo.upsert(&removed).expect("seed upsert");

        repo.apply_diff(&source, &[kept.clone()], &[removed.name.clone()]).expect("apply diff");

        assert!(repo.get(&kept.name, &source).expect("get").is_some());
        assert!(repo.get(&removed.name, &source).expect("get").is_none());
    }

    #[test]
    fn ruleset_upsert_rejects_unlicensed_licensed_flag() {
        let repo = RulesetRepository::new(open());
        let ruleset = Ruleset {
            customer_id: CustomerId::new("cust-1"),
            name: RulesetName::new("baseline"),
            version: RulesetVersion::new("1"),
            cloud: Cloud::Aws,
            rule_names: std::collections::BTreeSet::new(),
            licensed: true,
            license_keys: vec![],
            artifact: None,
        };
        assert!(repo.upsert(&ruleset).is_err());
    }

    #[test]
    fn rule_metadata_round_trips() {
        let repo = RuleMetadataRepository::new(open());
        let metadata = RuleMetadata {
            rule_name: RuleName::new("rule-a"),
            severity: rce_core::model::Severity::Critical,
            standards: Default::default(),
            mitre_techniques: vec!["T1530".to_string()],
            remediation: "fix it".to_string(),
            reported_fields: vec!["arn".to_string()],
        };
        repo.upsert(&metadata).expect("upsert");
        let loaded = repo.get(&metadata.rule_name).expect("get").expect("present");
        assert_eq!(loaded.mitre_techniques, vec!["T1530".to_string()]);
    }
}
