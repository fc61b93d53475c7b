// crates/rce-trigger/src/scheduler.rs
// ============================================================================
// Module: Cron Scheduler
// Description: RegisterJob/UpdateJob/DeregisterJob against the external
// trigger system, keeping the persisted ScheduledJob record in sync.
// Purpose: spec.md §4.4 cron scheduler.
// Dependencies: rce-core, rce-store-sqlite, crate::cron, tracing
// ============================================================================

use chrono::Utc;
use rce_core::identifiers::CustomerId;
use rce_core::identifiers::RulesetName;
use rce_core::identifiers::ScheduledJobId;
use rce_core::identifiers::TenantId;
use rce_core::interfaces::ExternalScheduler;
use rce_core::model::ScheduledJob;
use rce_store_sqlite::ScheduledJobRepository;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::cron::validate_cron_expression;
use crate::error::TriggerError;

/// Parameters for [`CronScheduler::register_job`].
#[derive(Debug, Clone)]
pub struct RegisterJobRequest {
    pub customer_id: CustomerId,
    pub tenant_id: TenantId,
    pub schedule_expression: String,
    pub target_regions: Vec<String>,
    pub target_rulesets: Vec<String>,
    pub target_env: serde_json::Value,
}

/// Wraps an [`ExternalScheduler`] and a [`ScheduledJobRepository`] to
/// implement spec.md §4.4's recurring-trigger CRUD.
pub struct CronScheduler<E> {
    scheduler: E,
    scheduled_jobs: ScheduledJobRepository,
}

impl<E> CronScheduler<E>
where
    E: ExternalScheduler,
{
    #[must_use]
    pub fn new(scheduler: E, scheduled_jobs: ScheduledJobRepository) -> Self {
        Self { scheduler, scheduled_jobs }
    }

    /// `RegisterJob`: validates the cron expression, registers a one-target
    /// rule pointing at the worker submission endpoint with `target_env`
    /// baked in, and persists the `ScheduledJob` record.
    ///
    /// # Errors
    /// Returns [`TriggerError::InvalidSchedule`] when the expression fails
    /// local syntax validation or the external scheduler rejects it.
    pub async fn register_job(&self, request: RegisterJobRequest) -> Result<ScheduledJob, TriggerError> {
        validate_cron_expression(&request.schedule_expression)?;

        let id = ScheduledJobId::new(sanitize_rule_name(&request.tenant_id, &request.customer_id));
        self.scheduler
            .register(id.as_str(), &request.schedule_expression, request.target_env)
            .await?;

        let scheduled_job = ScheduledJob {
            id,
            customer_id: request.customer_id,
            tenant_id: request.tenant_id,
            schedule_expression: request.schedule_expression,
            target_regions: request.target_regions,
            target_rulesets: request.target_rulesets.into_iter().map(RulesetName::new).collect(),
            enabled: true,
        };
        self.scheduled_jobs.upsert(&scheduled_job)?;
        info!(scheduled_job_id = %scheduled_job.id, "scheduled job registered");
        Ok(scheduled_job)
    }

    /// `UpdateJob`: mutates the external rule and the persisted record
    /// atomically on a best-effort basis. On external-scheduler failure,
    /// the persisted record is left untouched (spec.md §4.4: "on failure
    /// the record is reverted").
    ///
    /// # Errors
    /// Returns [`TriggerError::NotFound`] when no record exists for `id`,
    /// or propagates the external scheduler's failure.
    pub async fn update_job(
        &self,
        id: &ScheduledJobId,
        enabled: Option<bool>,
        schedule_expression: Option<String>,
    ) -> Result<ScheduledJob, TriggerError> {
        let span = info_span!("update_scheduled_job", scheduled_job_id = %id);
        let _guard = span.enter();

        let mut scheduled_job = self
            .scheduled_jobs
            .get(id)?
            .ok_or_else(|| TriggerError::NotFound(id.to_string()))?;

        if let Some(expression) = &schedule_expression {
            validate_cron_expression(expression)?;
        }

        if let Err(err) = self
            .scheduler
            .update(id.as_str(), schedule_expression.as_deref(), enabled)
            .await
        {
            warn!(error = %err, "external scheduler update failed, persisted record unchanged");
            return Err(err.into());
        }

        if let Some(enabled) = enabled {
            scheduled_job.enabled = enabled;
        }
        if let Some(expression) = schedule_expression {
            scheduled_job.schedule_expression = expression;
        }
        self.scheduled_jobs.upsert(&scheduled_job)?;
        Ok(scheduled_job)
    }

    /// `DeregisterJob`: removes the external rule-target, the rule, and the
    /// persisted record.
    ///
    /// # Errors
    /// Returns [`TriggerError::NotFound`] when no record exists for `id`.
    pub async fn deregister_job(&self, id: &ScheduledJobId) -> Result<(), TriggerError> {
        if self.scheduled_jobs.get(id)?.is_none() {
            return Err(TriggerError::NotFound(id.to_string()));
        }
        self.scheduler.deregister(id.as_str()).await?;
        self.scheduled_jobs.delete(id)?;
        info!(scheduled_job_id = %id, "scheduled job deregistered");
        Ok(())
    }
}

/// Builds a stable, sanitized rule name from a tenant/customer pair plus a
/// timestamp-free random-free component, so repeated registration requests
/// for the same tenant collide on the same `ScheduledJobId`.
fn sanitize_rule_name(tenant_id: &TenantId, customer_id: &CustomerId) -> String {
    let raw = format!("{customer_id}-{tenant_id}");
    raw.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rce_core::interfaces::SchedulerError;
    use rce_store_sqlite::SqliteStoreConfig;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct InMemoryScheduler {
        rules: Mutex<BTreeMap<String, (String, bool)>>,
        reject: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ExternalScheduler for InMemoryScheduler {
        async fn register(&self, rule_name: &str, schedule_expression: &str, _target_env: serde_json::Value) -> Result<(), SchedulerError> {
            if let Some(reason) = self.reject.lock().expect("lock").clone() {
                return Err(SchedulerError::InvalidSchedule(reason));
            }
            self.rules.lock().expect("lock").insert(rule_name.to_string(), (schedule_expression.to_string(), true));
            Ok(())
        }

        async fn update(&self, rule_name: &str, schedule_expression: Option<&str>, enabled: Option<bool>) -> Result<(), SchedulerError> {
            let mut rules = self.rules.lock().expect("lock");
            let entry = rules.get_mut(rule_name).ok_or_else(|| SchedulerError::Backend("no such rule".to_string()))?;
            if let Some(expression) = schedule_expression {
                entry.0 = expression.to_string();
            }
            if let Some(enabled) = enabled {
                entry.1 = enabled;
            }
            Ok(())
        }

        async fn deregister(&self, rule_name: &str) -> Result<(), SchedulerError> {
            self.rules.lock().expect("lock").remove(rule_name);
            Ok(())
        }
    }

    fn repository() -> ScheduledJobRepository {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SqliteStoreConfig::new(dir.path().join("store.db"));
        let connection = rce_store_sqlite::open(&config).expect("open");
        std::mem::forget(dir);
        ScheduledJobRepository::new(std::sync::Arc::new(Mutex::new(connection)))
    }

    fn request() -> RegisterJobRequest {
        RegisterJobRequest {
            customer_id: CustomerId::new("cust-1"),
            tenant_id: TenantId::new("tenant-1"),
            schedule_expression: "0 * * * *".to_string(),
            target_regions: vec!["us-east-1".to_string()],
            target_rulesets: vec!["baseline".to_string()],
            target_env: json!({ "JOB_TYPE": "SCHEDULED" }),
        }
    }

    #[tokio::test]
    async fn register_job_persists_and_registers_external_rule() {
        let scheduler = CronScheduler::new(InMemoryScheduler::default(), repository());
        let job = scheduler.register_job(request()).await.expect("register");
        assert!(job.enabled);
        assert_eq!(scheduler.scheduled_jobs.get(&job.id).expect("get").expect("present").id, job.id);
    }

    #[tokio::test]
    async fn register_job_rejects_malformed_cron() {
        let scheduler = CronScheduler::new(InMemoryScheduler::default(), repository());
        let mut bad_request = request();
        bad_request.schedule_expression = "not a cron".to_string();
        let result = scheduler.register_job(bad_request).await;
        assert!(matches!(result, Err(TriggerError::InvalidSchedule(_))));
    }

    #[tokio::test]
    async fn update_job_toggles_enabled_flag() {
        let scheduler = CronScheduler::new(InMemoryScheduler::default(), repository());
        let job = scheduler.register_job(request()).await.expect("register");
        let updated = scheduler.update_job(&job.id, Some(false), None).await.expect("update");
        assert!(!updated.enabled);
    }

    #[tokio::test]
    async fn deregister_job_removes_record() {
        let scheduler = CronScheduler::new(InMemoryScheduler::default(), repository());
        let job = scheduler.register_job(request()).await.expect("register");
        scheduler.deregister_job(&job.id).await.expect("deregister");
        assert!(scheduler.scheduled_jobs.get(&job.id).expect("get").is_none());
    }

    #[tokio::test]
    async fn deregister_job_missing_record_fails() {
        let scheduler = CronScheduler::new(InMemoryScheduler::default(), repository());
        let result = scheduler.deregister_job(&ScheduledJobId::new("missing")).await;
        assert!(matches!(result, Err(TriggerError::NotFound(_))));
    }
}
