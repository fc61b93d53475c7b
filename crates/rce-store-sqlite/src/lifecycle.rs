// crates/rce-store-sqlite/src/lifecycle.rs
// ============================================================================
// Module: Mutable Lifecycle Repositories
// Description: CRUD over Job, BatchResult, ScheduledJob, License, and
// RuleSource — the entities the orchestrator/trigger/syncer mutate in
// place, split from the read-mostly catalog surface per SPEC_FULL §3.
// Purpose: Durable persistence for spec.md §3's mutable-lifecycle entities.
// Dependencies: rusqlite, serde_json, rce-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rce_core::identifiers::JobId;
use rce_core::identifiers::LicenseKey;
use rce_core::identifiers::RuleSourceId;
use rce_core::identifiers::ScheduledJobId;
use rce_core::identifiers::TenantId;
use rce_core::model::Job;
use rce_core::model::License;
use rce_core::model::RuleSource;
use rce_core::model::ScheduledJob;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

fn lock(connection: &Arc<Mutex<Connection>>) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
    connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
}

/// Repository for [`Job`] records.
#[derive(Clone)]
pub struct JobRepository {
    connection: Arc<Mutex<Connection>>,
}

impl JobRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn save(&self, job: &Job) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(job).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let native_task_id = job.native_task_id.as_ref().map(ToString::to_string);
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO jobs (id, tenant_id, customer_id, status, native_task_id, json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET status = excluded.status, native_task_id = excluded.native_task_id, json = excluded.json",
                params![
                    job.id.to_string(),
                    job.tenant_id.as_str(),
                    job.customer_id.as_str(),
                    format!("{:?}", job.status),
                    native_task_id,
                    json
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: JobId) -> Result<Option<Job>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM jobs WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// Looks up a job by its worker-runtime native task id, used by
    /// `UpdateJobFromWorker` to map an incoming event back to the
    /// internally tracked [`Job`].
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn find_by_native_task_id(&self, native_task_id: &str) -> Result<Option<Job>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT json FROM jobs WHERE native_task_id = ?1",
                params![native_task_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Job>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM jobs WHERE tenant_id = ?1")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![tenant_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .collect()
    }
}

/// Repository for [`rce_core::model::BatchResult`] records.
#[derive(Clone)]
pub struct BatchResultRepository {
    connection: Arc<Mutex<Connection>>,
}

impl BatchResultRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn save(&self, batch_result: &rce_core::model::BatchResult) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(batch_result).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO batch_results (id, tenant_id, customer_id, status, dedup_key, json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET status = excluded.status, dedup_key = excluded.dedup_key, json = excluded.json",
                params![
                    batch_result.id.to_string(),
                    batch_result.tenant_id.as_str(),
                    batch_result.customer_id.as_str(),
                    format!("{:?}", batch_result.status),
                    batch_result.dedup_key,
                    json
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: rce_core::identifiers::BatchResultId) -> Result<Option<rce_core::model::BatchResult>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM batch_results WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// Looks up an existing batch result by its event-router dedup key, per
    /// spec.md §5's idempotent-creation requirement.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn find_by_dedup_key(&self, dedup_key: &str) -> Result<Option<rce_core::model::BatchResult>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM batch_results WHERE dedup_key = ?1", params![dedup_key], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }
}

/// Repository for [`ScheduledJob`] records.
#[derive(Clone)]
pub struct ScheduledJobRepository {
    connection: Arc<Mutex<Connection>>,
}

impl ScheduledJobRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, scheduled_job: &ScheduledJob) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(scheduled_job).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO scheduled_jobs (id, customer_id, tenant_id, json) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET json = excluded.json",
                params![
                    scheduled_job.id.as_str(),
                    scheduled_job.customer_id.as_str(),
                    scheduled_job.tenant_id.as_str(),
                    json
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: &ScheduledJobId) -> Result<Option<ScheduledJob>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM scheduled_jobs WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn delete(&self, id: &ScheduledJobId) -> Result<(), SqliteStoreError> {
        let guard = lock(&self.connection)?;
        guard
            .execute("DELETE FROM scheduled_jobs WHERE id = ?1", params![id.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_all(&self) -> Result<Vec<ScheduledJob>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM scheduled_jobs")
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

/// Repository for [`License`] records.
#[derive(Clone)]
pub struct LicenseRepository {
    connection: Arc<Mutex<Connection>>,
}

impl LicenseRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, license: &License) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(license).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO licenses (license_key, json) VALUES (?1, ?2)
                 ON CONFLICT(license_key) DO UPDATE SET json = excluded.json",
                params![license.key.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Removes a license, per spec.md §3's "removed when the underlying
    /// application handle is deleted" lifecycle. Cascading ruleset cleanup
    /// is the caller's responsibility (see
    /// `rce_license::cascade_license_removal`).
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn remove(&self, key: &LicenseKey) -> Result<(), SqliteStoreError> {
        let guard = lock(&self.connection)?;
        guard
            .execute("DELETE FROM licenses WHERE license_key = ?1", params![key.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_all(&self) -> Result<Vec<License>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let mut statement = guard
            .prepare("SELECT json FROM licenses")
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

/// Repository for [`RuleSource`]'s mutable sync state.
#[derive(Clone)]
pub struct RuleSourceRepository {
    connection: Arc<Mutex<Connection>>,
}

impl RuleSourceRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, rule_source: &RuleSource) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(rule_source).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = lock(&self.connection)?;
        guard
            .execute(
                "INSERT INTO rule_sources (id, customer_id, json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET json = excluded.json",
                params![rule_source.id.as_str(), rule_source.customer_id.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: &RuleSourceId) -> Result<Option<RuleSource>, SqliteStoreError> {
        let guard = lock(&self.connection)?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM rule_sources WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use rce_core::model::Job;
    use rce_core::model::RulesetView;
    use rce_core::model::ScanType;

    use super::*;
    use crate::connection;

    fn open() -> Arc<Mutex<Connection>> {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = connection::SqliteStoreConfig::new(dir.path().join("store.db"));
        let conn = connection::open(&config).expect("open");
        std::mem::forget(dir);
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn job_save_then_get_round_trips() {
        let repo = JobRepository::new(open());
        let now = chrono::Utc::now();
        let job = Job::submit(
            TenantId::new("tenant-1"),
            rce_core::identifiers::CustomerId::new("cust-1"),
            "operator",
            RulesetView::default(),
            vec!["us-east-1".to_string()],
            ScanType::Manual,
            vec![],
            now,
        );
        repo.save(&job).expect("save");
        let loaded = repo.get(job.id).expect("get").expect("present");
        assert_eq!(loaded.tenant_id, job.tenant_id);
    }

    #[test]
    fn scheduled_job_delete_removes_record() {
        let repo = ScheduledJobRepository::new(open());
        let scheduled = ScheduledJob {
            id: ScheduledJobId::new("sched-1"),
            customer_id: rce_core::identifiers::CustomerId::new("cust-1"),
            tenant_id: TenantId::new("tenant-1"),
            schedule_expression: "0 * * * *".to_string(),
            target_regions: vec!["us-east-1".to_string()],
            target_rulesets: vec![],
            enabled: true,
        };
        repo.upsert(&scheduled).expect("upsert");
        repo.delete(&scheduled.id).expect("delete");
        assert!(repo.get(&scheduled.id).expect("get").is_none());
    }
}
