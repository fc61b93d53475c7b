// crates/rce-core/src/interfaces/mod.rs
// ============================================================================
// Module: External Collaborator Interfaces
// Description: Backend-agnostic traits for object storage, secrets, worker
// dispatch, the License Manager, git hosts, the external scheduler, and the
// rule metadata registry.
// Purpose: Define the contract surfaces named in spec.md §6.
// Dependencies: crate::model, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Every collaborator the core depends on but does not own — object store,
//! secret store, worker runtime, License Manager, git host, external
//! scheduler — is named here as a trait. Implementations must be
//! deterministic given their backing state and must fail closed on
//! ambiguous input; production and in-memory fake implementations live in
//! each owning crate (`rce-sharding`, `rce-license`, `rce-rulesource`,
//! `rce-trigger`), not here.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::identifiers::RuleName;
use crate::model::RuleMetadata;

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object store transient failure: {0}")]
    Transient(String),
    #[error("object store error: {0}")]
    Backend(String),
}

/// One entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectListing {
    pub key: String,
    pub size: u64,
}

/// Backend-agnostic object store, matching spec.md §6's required capability
/// set (`PUT`/`GET`/`HEAD`/`LIST`/`DELETE`/`COPY` plus presigned GET).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key`. `content_encoding` is set verbatim on
    /// the stored object (the shard format always passes `"gzip"`).
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::Transient`] on a retryable backend
    /// failure, [`ObjectStoreError::Backend`] otherwise.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_encoding: Option<&str>,
    ) -> Result<(), ObjectStoreError>;

    /// Reads the object at `key`.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::NotFound`] when the key does not exist.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Returns the object's size without transferring its body.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::NotFound`] when the key does not exist.
    async fn head(&self, key: &str) -> Result<u64, ObjectStoreError>;

    /// Lists keys under `prefix`. When `delimiter` is set, behaves like a
    /// common-prefix listing (required for the snapshot nearest-older
    /// lookup of spec.md §4.2).
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::Backend`] on backend failure.
    async fn list(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Vec<ObjectListing>, ObjectStoreError>;

    /// Deletes the object at `key`. Idempotent: deleting a missing key is
    /// not an error.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::Backend`] on backend failure.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Copies `source` to `dest` within the same store.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::NotFound`] when `source` does not exist.
    async fn copy(&self, source: &str, dest: &str) -> Result<(), ObjectStoreError>;

    /// Issues a presigned GET URL for `key`, valid for `expires_in_secs`.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::Backend`] when the backend cannot sign
    /// (e.g. a purely in-memory fake used in tests).
    async fn presign_get(
        &self,
        key: &str,
        expires_in_secs: u64,
    ) -> Result<String, ObjectStoreError>;
}

// ============================================================================
// SECTION: Secret Store
// ============================================================================

/// Secret store errors.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("secret store error: {0}")]
    Backend(String),
}

/// Short-lived credential/token storage. Entries carry an optional TTL on
/// creation; deletion is idempotent (spec.md §5).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Creates or overwrites a secret, optionally with a TTL in seconds.
    ///
    /// # Errors
    /// Returns [`SecretStoreError::Backend`] on backend failure.
    async fn create(
        &self,
        name: &str,
        value: &str,
        ttl_secs: Option<u64>,
    ) -> Result<(), SecretStoreError>;

    /// Reads a secret.
    ///
    /// # Errors
    /// Returns [`SecretStoreError::NotFound`] when the secret is absent or
    /// has expired.
    async fn get(&self, name: &str) -> Result<String, SecretStoreError>;

    /// Deletes a secret. Idempotent.
    ///
    /// # Errors
    /// Returns [`SecretStoreError::Backend`] on backend failure.
    async fn delete(&self, name: &str) -> Result<(), SecretStoreError>;
}

// ============================================================================
// SECTION: Worker Dispatch (Engine)
// ============================================================================

/// Worker dispatch errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("worker dispatch unavailable: {0}")]
    Unavailable(String),
    #[error("worker dispatch error: {0}")]
    Dispatch(String),
}

/// Env vars the core sets on every submitted batch, per spec.md §6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerEnv {
    pub submitted_at: String,
    pub scheduled_job_name: Option<String>,
    pub target_regions: Vec<String>,
    pub target_rulesets_view: Vec<String>,
    pub licensed_rulesets: Vec<String>,
    pub affected_licenses: Vec<String>,
    pub job_type: String,
    pub batch_results_ids: Vec<String>,
    pub tenant_name: String,
    pub credentials_key: Option<String>,
}

/// Black-box worker-runtime collaborator responsible for running the
/// embedded policy engine against a tenant's resources. Out of scope per
/// spec.md §1 Non-goals beyond this dispatch seam.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Submits a batch execution and returns the runtime's native job id.
    ///
    /// # Errors
    /// Returns [`EngineError::Unavailable`] when the runtime cannot accept
    /// new work.
    async fn submit_batch(
        &self,
        job_definition: &str,
        queue: &str,
        env: WorkerEnv,
        credentials_key: Option<&str>,
    ) -> Result<String, EngineError>;

    /// Returns the ARN of the default job definition.
    async fn job_definition_arn(&self) -> Result<String, EngineError>;

    /// Returns the ARN of the default job queue.
    async fn job_queue_arn(&self) -> Result<String, EngineError>;

    /// Creates a new job definition derived from an existing one with a
    /// different container image.
    async fn create_job_definition_from_existing(
        &self,
        existing_definition: &str,
        image_url: &str,
    ) -> Result<String, EngineError>;
}

// ============================================================================
// SECTION: License Manager Transport
// ============================================================================

/// License Manager transport errors.
#[derive(Debug, Error)]
pub enum LicenseTransportError {
    #[error("license manager forbidden")]
    Forbidden,
    #[error("license manager resource not found")]
    NotFound,
    #[error("license manager invalid request: {0}")]
    InvalidData(String),
    #[error("license manager unavailable: {0}")]
    Unavailable(String),
}

/// The six HTTP endpoints used by the License Client, per spec.md §4.5/§6.
/// `rce-license` owns the request/response shapes; this trait is the raw
/// transport seam so it can be faked in tests without standing up HTTP.
#[async_trait]
pub trait LicenseManagerTransport: Send + Sync {
    /// `GET /whoami`; returns the server's `Accept-Version` header value.
    async fn whoami(&self, token: &str) -> Result<String, LicenseTransportError>;

    /// `POST /license/sync`.
    async fn sync_license(
        &self,
        token: &str,
        license_key: &str,
    ) -> Result<serde_json::Value, LicenseTransportError>;

    /// `POST /jobs`.
    async fn post_job(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, LicenseTransportError>;

    /// `PATCH /jobs`.
    async fn patch_job(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, LicenseTransportError>;

    /// `POST /jobs/check-permission`.
    async fn check_permission(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, LicenseTransportError>;

    /// `POST /customers/set-activation-date`.
    async fn set_activation_date(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Result<(), LicenseTransportError>;

    /// `POST /registry/ruleset`; requires `>= 3.0` per version negotiation.
    async fn publish_ruleset(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, LicenseTransportError>;
}

// ============================================================================
// SECTION: Git Host Client
// ============================================================================

/// Git host errors.
#[derive(Debug, Error)]
pub enum GitHostError {
    #[error("git host resource not found: {0}")]
    NotFound(String),
    #[error("git host error: {0}")]
    Backend(String),
}

/// Blame information for one file, used to stamp synced rules (spec.md
/// §4.6). Missing blame data is tolerated by the caller, not by this trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameInfo {
    pub commit_hash: String,
    pub updated_date: String,
}

/// Git-origin archive pull and blame-stamping collaborator.
#[async_trait]
pub trait GitHostClient: Send + Sync {
    /// Fetches the rule-source's tree as a single tarball.
    ///
    /// # Errors
    /// Returns [`GitHostError::NotFound`] when the project/ref does not
    /// exist.
    async fn fetch_archive(
        &self,
        project_id: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, GitHostError>;

    /// Looks up the last commit touching `path`.
    ///
    /// # Errors
    /// Returns [`GitHostError::NotFound`] when no blame information is
    /// available; callers treat this as tolerable, not fatal.
    async fn blame_commit(
        &self,
        project_id: &str,
        path: &str,
    ) -> Result<BlameInfo, GitHostError>;
}

// ============================================================================
// SECTION: External Scheduler
// ============================================================================

/// External scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid schedule expression: {0}")]
    InvalidSchedule(String),
    #[error("external scheduler error: {0}")]
    Backend(String),
}

/// CRUD seam against the external cron/rate trigger system (e.g. an
/// EventBridge rule), per spec.md §4.4.
#[async_trait]
pub trait ExternalScheduler: Send + Sync {
    /// Registers a one-target rule firing on `schedule_expression`, with
    /// `target_env` baked into the target invocation payload.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidSchedule`] when the underlying
    /// scheduler rejects the expression.
    async fn register(
        &self,
        rule_name: &str,
        schedule_expression: &str,
        target_env: serde_json::Value,
    ) -> Result<(), SchedulerError>;

    /// Updates an existing rule's expression and/or enabled state.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Backend`] on backend failure; callers must
    /// revert the persisted record on error (spec.md §4.4).
    async fn update(
        &self,
        rule_name: &str,
        schedule_expression: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<(), SchedulerError>;

    /// Removes a rule and its target.
    async fn deregister(&self, rule_name: &str) -> Result<(), SchedulerError>;
}

// ============================================================================
// SECTION: Metadata Registry
// ============================================================================

/// Metadata registry errors.
#[derive(Debug, Error)]
pub enum MetadataRegistryError {
    #[error("no metadata registered for rule {0}")]
    NotFound(RuleName),
}

/// Read-only registry mapping rule names to enriched metadata (spec.md §3
/// Metadata). Backed by a versioned, license-supplied bundle; this core
/// only defines the read seam and a static in-memory implementation for
/// tests and local operation.
pub trait MetadataRegistry: Send + Sync {
    /// Looks up metadata for `rule`.
    ///
    /// # Errors
    /// Returns [`MetadataRegistryError::NotFound`] when the rule has no
    /// registered metadata.
    fn lookup(&self, rule: &RuleName) -> Result<RuleMetadata, MetadataRegistryError>;

    /// Returns every rule name the registry has metadata for a given
    /// standard, used by coverage math to enumerate `full[S]`.
    fn rules_for_standard(&self, standard: &str) -> Vec<RuleName>;
}
