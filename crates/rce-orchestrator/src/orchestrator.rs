// crates/rce-orchestrator/src/orchestrator.rs
// ============================================================================
// Module: Job Orchestrator
// Description: SubmitJob admission pipeline and UpdateJobFromWorker
// lifecycle update, tying the License Client, worker dispatch (Engine),
// credential release (SecretStore), rce-store-sqlite persistence, and the
// Result Sharding & Storage Engine together.
// Purpose: spec.md §4.1 verbatim, plus §4.2/§5's "a job's scan output is
// merged into the tenant's latest/ state on completion" and the bounded
// worker pool / per-tenant write lock of the concurrency model.
// Dependencies: rce-core, rce-license, rce-sharding, rce-store-sqlite,
// tokio, tracing
// ============================================================================

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use rce_core::identifiers::CelerySlotId;
use rce_core::identifiers::CustomerId;
use rce_core::identifiers::TenantId;
use rce_core::interfaces::Engine;
use rce_core::interfaces::ObjectStore;
use rce_core::interfaces::SecretStore;
use rce_core::interfaces::WorkerEnv;
use rce_core::model::Cloud;
use rce_core::model::Job;
use rce_core::model::JobStatus;
use rce_core::model::RulesetView;
use rce_core::model::ScanType;
use rce_core::model::ScopedLicense;
use rce_core::model::ShardPart;
use rce_license::LicenseClient;
use rce_license::resolve_license_for_tenant;
use rce_sharding::ShardsCollection;
use rce_sharding::TenantWriteLocks;
use rce_store_sqlite::JobRepository;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::error::OrchestratorError;
use crate::error::map_engine_error;
use crate::error::map_license_error;
use crate::metrics::JobOrchestratorMetrics;

/// Parameters accepted by [`JobOrchestrator::submit_job`].
#[derive(Debug, Clone)]
pub struct SubmitJobRequest {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub tenant_name: String,
    pub owner: String,
    pub requested_rulesets: Vec<String>,
    pub target_regions: Vec<String>,
    pub credentials_key: Option<String>,
    pub job_definition: String,
    pub job_queue: String,
}

/// Event payload reported by the worker runtime, consumed by
/// [`JobOrchestrator::update_job_from_worker`]. Distinct from
/// [`WorkerEnv`], which the orchestrator itself sets at submission time.
#[derive(Debug, Clone)]
pub struct WorkerReportDetail {
    pub status: JobStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub job_queue: Option<String>,
    pub job_definition: Option<String>,
    pub scan_regions: Option<Vec<String>>,
    pub scan_rulesets: Option<Vec<String>>,
    /// Cloud and account the scan ran against, required to key the shard
    /// store's `raw/{customer}/{cloud}/{account}/latest/` namespace.
    /// `None` for workers that report status only (e.g. the defensive
    /// record path never has one to report).
    pub cloud: Option<Cloud>,
    pub account: Option<String>,
    /// The shard parts produced by this job's scan. Merged into the
    /// tenant's `latest/` state on a successful terminal report; absent or
    /// empty otherwise.
    pub scan_results: Option<Vec<ShardPart>>,
}

/// Ties the License Client, worker dispatch, credential release, and
/// persistence together for job admission and lifecycle updates.
pub struct JobOrchestrator<T, S, E> {
    jobs: JobRepository,
    license: LicenseClient<T, S>,
    engine: E,
    credentials: S,
    metrics: JobOrchestratorMetrics,
    object_store: Arc<dyn ObjectStore>,
    tenant_locks: Arc<TenantWriteLocks>,
    /// Bounds how many worker dispatches this orchestrator has in flight
    /// at once (spec.md §5 "bounded worker pools").
    dispatch_permits: Arc<Semaphore>,
}

impl<T, S, E> JobOrchestrator<T, S, E>
where
    T: rce_core::interfaces::LicenseManagerTransport,
    S: SecretStore,
    E: Engine,
{
    pub fn new(
        jobs: JobRepository,
        license: LicenseClient<T, S>,
        engine: E,
        credentials: S,
        object_store: Arc<dyn ObjectStore>,
        max_concurrent_dispatches: usize,
    ) -> Self {
        Self {
            jobs,
            license,
            engine,
            credentials,
            metrics: JobOrchestratorMetrics::new(),
            object_store,
            tenant_locks: Arc::new(TenantWriteLocks::new()),
            dispatch_permits: Arc::new(Semaphore::new(max_concurrent_dispatches)),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &JobOrchestratorMetrics {
        &self.metrics
    }

    /// Admits and dispatches a new Job, per spec.md §4.1.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::NoLicense`] when no license applies,
    /// [`OrchestratorError::InvalidRulesets`] when ruleset expansion
    /// resolves to nothing, [`OrchestratorError::QuotaExceeded`] on a
    /// permission/allowance denial, and the mapped License Manager /
    /// worker-dispatch errors otherwise.
    pub async fn submit_job(
        &self,
        request: SubmitJobRequest,
        license_candidates: &[ScopedLicense],
        now: DateTime<Utc>,
    ) -> Result<Job, OrchestratorError> {
        let span = info_span!("submit_job", tenant_id = %request.tenant_id, customer_id = %request.customer_id);
        let _guard = span.enter();

        let license = resolve_license_for_tenant(license_candidates, &request.customer_id, &request.tenant_id, now)
            .map_err(map_license_error)?;

        let licensed: Vec<String> = license.ruleset_names.iter().map(ToString::to_string).collect();
        let requested = if request.requested_rulesets.is_empty() {
            licensed.clone()
        } else {
            request.requested_rulesets.clone()
        };
        if requested.is_empty() {
            self.metrics.record_admission_rejected();
            return Err(OrchestratorError::InvalidRulesets);
        }

        let allowed = self
            .license
            .check_permission(&request.customer_id, &request.tenant_id, now)
            .await
            .map_err(map_license_error)?;
        if !allowed {
            self.metrics.record_admission_rejected();
            return Err(OrchestratorError::QuotaExceeded);
        }

        let rulesets = RulesetView {
            requested: requested.iter().map(|name| rce_core::identifiers::RulesetName::new(name.clone())).collect(),
            licensed: licensed.iter().map(|name| rce_core::identifiers::RulesetName::new(name.clone())).collect(),
        };

        let mut job = Job::submit(
            request.tenant_id.clone(),
            request.customer_id.clone(),
            request.owner.clone(),
            rulesets,
            request.target_regions.clone(),
            ScanType::Manual,
            vec![license.key.clone()],
            now,
        );

        let post_body = json!({
            "job_id": job.id.to_string(),
            "tenant_id": request.tenant_id.as_str(),
            "rulesets": requested,
        });
        self.license
            .post_job(&request.customer_id, post_body, now)
            .await
            .map_err(map_license_error)?;

        job.job_definition = Some(request.job_definition.clone());
        job.job_queue = Some(request.job_queue.clone());
        self.jobs.save(&job)?;

        let env = WorkerEnv {
            submitted_at: job.submitted_at.to_rfc3339(),
            scheduled_job_name: job.scheduled_rule_name.clone(),
            target_regions: job.target_regions.clone(),
            target_rulesets_view: requested.clone(),
            licensed_rulesets: licensed,
            affected_licenses: vec![license.key.to_string()],
            job_type: "MANUAL".to_string(),
            batch_results_ids: vec![],
            tenant_name: request.tenant_name.clone(),
            credentials_key: request.credentials_key.clone(),
        };

        let _permit = self.dispatch_permits.acquire().await.expect("dispatch semaphore never closed");
        let native_task_id = self
            .engine
            .submit_batch(&request.job_definition, &request.job_queue, env, request.credentials_key.as_deref())
            .await
            .map_err(map_engine_error)?;
        job.native_task_id = Some(CelerySlotId::new(native_task_id));
        self.jobs.save(&job)?;

        self.metrics.record_submitted();
        info!(job_id = %job.id, "job admitted and dispatched");
        Ok(job)
    }

    /// Applies a worker status report, per spec.md §4.1. Creates a
    /// defensive Job record from `env` when `native_task_id` is unknown.
    ///
    /// # Errors
    /// Propagates persistence failures only; License Manager
    /// unavailability during this best-effort path is logged and
    /// swallowed, never returned.
    pub async fn update_job_from_worker(
        &self,
        native_task_id: &str,
        detail: &WorkerReportDetail,
        env: &WorkerEnv,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let mut job = match self.jobs.find_by_native_task_id(native_task_id)? {
            Some(job) => job,
            None => self.defensive_job_from_env(native_task_id, env, now)?,
        };

        let span = info_span!("update_job_from_worker", job_id = %job.id, tenant_id = %job.tenant_id);
        let _guard = span.enter();

        if let Some(created_at) = detail.created_at {
            job.set_created_at_if_absent(created_at);
        }
        if let Some(started_at) = detail.started_at {
            job.set_started_at_if_absent(started_at);
        }
        if let Some(stopped_at) = detail.stopped_at {
            job.set_stopped_at_if_absent(stopped_at);
        }
        if job.job_queue.is_none() {
            job.job_queue = detail.job_queue.clone();
        }
        if job.job_definition.is_none() {
            job.job_definition = detail.job_definition.clone();
        }
        if job.target_regions.is_empty() {
            if let Some(regions) = &detail.scan_regions {
                job.target_regions = regions.clone();
            }
        }
        if job.rulesets.requested.is_empty() {
            if let Some(rulesets) = &detail.scan_rulesets {
                job.rulesets.requested = rulesets.iter().map(|name| rce_core::identifiers::RulesetName::new(name.clone())).collect();
            }
        }

        job.apply_status(detail.status);

        if job.status.is_terminal() {
            if let Some(key) = &env.credentials_key {
                if let Err(err) = self.credentials.delete(key).await {
                    warn!(error = %err, "failed to release job credentials");
                }
            }
            self.metrics.record_terminal();

            if job.status == JobStatus::Succeeded {
                if let (Some(cloud), Some(account), Some(parts)) = (detail.cloud, &detail.account, &detail.scan_results) {
                    if !parts.is_empty() {
                        self.persist_scan_results(&job, cloud, account, parts.clone()).await?;
                    }
                }
            }

            if job.is_licensed() {
                let body = json!({
                    "job_id": job.id.to_string(),
                    "created_at": job.created_at.map(|value| value.to_rfc3339()),
                    "started_at": job.started_at.map(|value| value.to_rfc3339()),
                    "stopped_at": job.stopped_at.map(|value| value.to_rfc3339()),
                    "status": format!("{:?}", job.status),
                });
                self.license.patch_job_best_effort(&job.customer_id, body, now).await;
            }
        }

        self.jobs.save(&job)?;
        self.metrics.record_worker_update_applied();
        Ok(())
    }

    /// Merges a completed job's scan output into the tenant's `latest/`
    /// state (spec.md §4.2). Writes are serialized per tenant via
    /// [`TenantWriteLocks`] (spec.md §5); readers are never blocked.
    ///
    /// # Errors
    /// Propagates [`OrchestratorError::ObjectStore`] on a read or write
    /// failure against the shard store.
    async fn persist_scan_results(&self, job: &Job, cloud: Cloud, account: &str, parts: Vec<ShardPart>) -> Result<(), OrchestratorError> {
        let _guard = self.tenant_locks.acquire(&job.tenant_id).await;
        let mut collection = ShardsCollection::read(job.customer_id.as_str(), cloud, account, self.object_store.as_ref()).await?;
        for part in parts {
            collection.put_part(part);
        }
        collection.write(self.object_store.as_ref()).await?;
        Ok(())
    }

    fn defensive_job_from_env(&self, native_task_id: &str, env: &WorkerEnv, now: DateTime<Utc>) -> Result<Job, OrchestratorError> {
        warn!(native_task_id, "worker reported unknown job, creating defensive record");
        let mut job = Job::submit(
            TenantId::new(env.tenant_name.clone()),
            CustomerId::new(String::new()),
            "worker-defensive",
            RulesetView::default(),
            env.target_regions.clone(),
            ScanType::Manual,
            vec![],
            now,
        );
        job.scheduled_rule_name = env.scheduled_job_name.clone();
        job.native_task_id = Some(CelerySlotId::new(native_task_id.to_string()));
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rce_core::interfaces::EngineError;
    use rce_core::interfaces::SecretStoreError;
    use rce_core::model::Allowance;
    use rce_core::model::AttachmentModel;
    use rce_core::model::BalanceExhaustionModel;
    use rce_core::model::CustomerScope;
    use rce_core::model::License;
    use rce_core::model::ScopeRank;
    use rce_core::model::TimeRange;
    use rce_license::HmacTokenSigner;
    use rce_license::InMemoryLicenseManagerTransport;
    use rce_store_sqlite::SqliteStoreConfig;

    use super::*;

    #[derive(Default)]
    struct InMemorySecretStore {
        values: Mutex<BTreeMap<String, String>>,
    }

    #[async_trait]
    impl SecretStore for InMemorySecretStore {
        async fn create(&self, name: &str, value: &str, _ttl_secs: Option<u64>) -> Result<(), SecretStoreError> {
            self.values.lock().expect("lock").insert(name.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, name: &str) -> Result<String, SecretStoreError> {
            self.values
                .lock()
                .expect("lock")
                .get(name)
                .cloned()
                .ok_or_else(|| SecretStoreError::NotFound(name.to_string()))
        }

        async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
            self.values.lock().expect("lock").remove(name);
            Ok(())
        }
    }

    struct InMemoryEngine {
        next_task_id: Mutex<u64>,
    }

    impl Default for InMemoryEngine {
        fn default() -> Self {
            Self { next_task_id: Mutex::new(0) }
        }
    }

    #[async_trait]
    impl Engine for InMemoryEngine {
        async fn submit_batch(&self, _job_definition: &str, _queue: &str, _env: WorkerEnv, _credentials_key: Option<&str>) -> Result<String, EngineError> {
            let mut next = self.next_task_id.lock().expect("lock");
            *next += 1;
            Ok(format!("task-{next}"))
        }

        async fn job_definition_arn(&self) -> Result<String, EngineError> {
            Ok("arn:job-definition".to_string())
        }

        async fn job_queue_arn(&self) -> Result<String, EngineError> {
            Ok("arn:job-queue".to_string())
        }

        async fn create_job_definition_from_existing(&self, _existing_definition: &str, _image_url: &str) -> Result<String, EngineError> {
            Ok("arn:job-definition-derived".to_string())
        }
    }

    fn orchestrator() -> JobOrchestrator<InMemoryLicenseManagerTransport, InMemorySecretStore, InMemoryEngine> {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SqliteStoreConfig::new(dir.path().join("store.db"));
        let connection = rce_store_sqlite::open(&config).expect("open");
        std::mem::forget(dir);
        let jobs = JobRepository::new(Arc::new(Mutex::new(connection)));
        let license = LicenseClient::new(
            InMemoryLicenseManagerTransport::new("2.9"),
            InMemorySecretStore::default(),
            Arc::new(HmacTokenSigner::new(b"test-key".to_vec())),
        );
        let object_store: Arc<dyn ObjectStore> = Arc::new(rce_sharding::InMemoryObjectStore::new());
        JobOrchestrator::new(jobs, license, InMemoryEngine::default(), InMemorySecretStore::default(), object_store, 4)
    }

    fn sample_license(customer: &CustomerId, tenant: &TenantId) -> ScopedLicense {
        let mut customer_scopes = BTreeMap::new();
        customer_scopes.insert(
            customer.clone(),
            CustomerScope {
                tenant_license_key: rce_core::identifiers::LicenseKey::new("lic-1"),
                attachment_model: AttachmentModel::Permitted,
                tenant_names: vec![tenant.clone()],
            },
        );
        ScopedLicense {
            license: License {
                key: rce_core::identifiers::LicenseKey::new("lic-1"),
                expiration: Utc::now() + chrono::Duration::days(30),
                synced_at: Utc::now(),
                allowance: Allowance {
                    model: BalanceExhaustionModel::Collective,
                    job_balance: 100,
                    time_range: TimeRange::Month,
                },
                event_driven: false,
                customer_scopes,
                ruleset_names: vec![rce_core::identifiers::RulesetName::new("baseline")],
            },
            rank: ScopeRank::SpecificTenant,
            application_id: "app-1".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_job_admits_and_dispatches() {
        let orchestrator = orchestrator();
        let customer = CustomerId::new("cust-1");
        let tenant = TenantId::new("tenant-1");
        let candidates = vec![sample_license(&customer, &tenant)];
        let now = Utc::now();

        let job = orchestrator
            .submit_job(
                SubmitJobRequest {
                    tenant_id: tenant.clone(),
                    customer_id: customer.clone(),
                    tenant_name: "tenant-one".to_string(),
                    owner: "operator".to_string(),
                    requested_rulesets: vec![],
                    target_regions: vec!["us-east-1".to_string()],
                    credentials_key: None,
                    job_definition: "job-def".to_string(),
                    job_queue: "job-queue".to_string(),
                },
                &candidates,
                now,
            )
            .await
            .expect("submit");

        assert_eq!(job.status, JobStatus::Submitted);
        assert!(job.native_task_id.is_some());
        assert_eq!(orchestrator.metrics().snapshot().submitted, 1);
    }

    #[tokio::test]
    async fn submit_job_without_license_fails() {
        let orchestrator = orchestrator();
        let customer = CustomerId::new("cust-1");
        let tenant = TenantId::new("tenant-1");
        let now = Utc::now();

        let result = orchestrator
            .submit_job(
                SubmitJobRequest {
                    tenant_id: tenant,
                    customer_id: customer,
                    tenant_name: "tenant-one".to_string(),
                    owner: "operator".to_string(),
                    requested_rulesets: vec![],
                    target_regions: vec!["us-east-1".to_string()],
                    credentials_key: None,
                    job_definition: "job-def".to_string(),
                    job_queue: "job-queue".to_string(),
                },
                &[],
                now,
            )
            .await;

        assert!(matches!(result, Err(OrchestratorError::NoLicense)));
    }

    #[tokio::test]
    async fn update_job_from_worker_applies_terminal_status_once() {
        let orchestrator = orchestrator();
        let customer = CustomerId::new("cust-1");
        let tenant = TenantId::new("tenant-1");
        let candidates = vec![sample_license(&customer, &tenant)];
        let now = Utc::now();

        let job = orchestrator
            .submit_job(
                SubmitJobRequest {
                    tenant_id: tenant,
                    customer_id: customer,
                    tenant_name: "tenant-one".to_string(),
                    owner: "operator".to_string(),
                    requested_rulesets: vec![],
                    target_regions: vec!["us-east-1".to_string()],
                    credentials_key: None,
                    job_definition: "job-def".to_string(),
                    job_queue: "job-queue".to_string(),
                },
                &candidates,
                now,
            )
            .await
            .expect("submit");
        let native_task_id = job.native_task_id.expect("native id").to_string();

        let detail = WorkerReportDetail {
            status: JobStatus::Succeeded,
            created_at: Some(now),
            started_at: Some(now),
            stopped_at: Some(now),
            job_queue: None,
            job_definition: None,
            scan_regions: None,
            scan_rulesets: None,
            cloud: None,
            account: None,
            scan_results: None,
        };
        let env = WorkerEnv::default();
        orchestrator
            .update_job_from_worker(&native_task_id, &detail, &env, now)
            .await
            .expect("update");

        let stored = orchestrator.jobs.get(job.id).expect("get").expect("present");
        assert_eq!(stored.status, JobStatus::Succeeded);
        assert_eq!(orchestrator.metrics().snapshot().terminal_jobs, 1);
    }

    #[tokio::test]
    async fn update_job_from_worker_merges_scan_results_into_latest_state() {
        let orchestrator = orchestrator();
        let customer = CustomerId::new("cust-1");
        let tenant = TenantId::new("tenant-1");
        let candidates = vec![sample_license(&customer, &tenant)];
        let now = Utc::now();

        let job = orchestrator
            .submit_job(
                SubmitJobRequest {
                    tenant_id: tenant,
                    customer_id: customer.clone(),
                    tenant_name: "tenant-one".to_string(),
                    owner: "operator".to_string(),
                    requested_rulesets: vec![],
                    target_regions: vec!["us-east-1".to_string()],
                    credentials_key: None,
                    job_definition: "job-def".to_string(),
                    job_queue: "job-queue".to_string(),
                },
                &candidates,
                now,
            )
            .await
            .expect("submit");
        let native_task_id = job.native_task_id.expect("native id").to_string();

        let part = ShardPart::new("baseline", "us-east-1", now.timestamp() as f64, vec![serde_json::json!({"id": "i-1"})]);
        let detail = WorkerReportDetail {
            status: JobStatus::Succeeded,
            created_at: Some(now),
            started_at: Some(now),
            stopped_at: Some(now),
            job_queue: None,
            job_definition: None,
            scan_regions: None,
            scan_rulesets: None,
            cloud: Some(Cloud::Aws),
            account: Some("111122223333".to_string()),
            scan_results: Some(vec![part]),
        };
        let env = WorkerEnv::default();
        orchestrator
            .update_job_from_worker(&native_task_id, &detail, &env, now)
            .await
            .expect("update");

        let collection = ShardsCollection::read(customer.as_str(), Cloud::Aws, "111122223333", orchestrator.object_store.as_ref())
            .await
            .expect("read latest state");
        assert_eq!(collection.len(), 1);
    }
}
