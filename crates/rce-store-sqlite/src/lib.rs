// crates/rce-store-sqlite/src/lib.rs
// ============================================================================
// Crate: rce-store-sqlite
// Description: SQLite-backed persistence for every spec.md §3 entity, split
// into a mutable-lifecycle store (Job, BatchResult, ScheduledJob, License,
// RuleSource) and a read-mostly catalog store (Rule, Ruleset, RuleMetadata)
// sharing one connection.
// Purpose: Durable storage backend consumed by rce-orchestrator, rce-trigger,
// rce-license, and rce-rulesource.
// Dependencies: rusqlite, serde_json, rce-core
// ============================================================================

pub mod catalog;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod tenant;

pub use catalog::RuleMetadataRepository;
pub use catalog::RuleRepository;
pub use catalog::RulesetRepository;
pub use connection::SqliteStoreConfig;
pub use connection::open;
pub use error::SqliteStoreError;
pub use lifecycle::BatchResultRepository;
pub use lifecycle::JobRepository;
pub use lifecycle::LicenseRepository;
pub use lifecycle::RuleSourceRepository;
pub use lifecycle::ScheduledJobRepository;
pub use tenant::CustomerRepository;
pub use tenant::TenantRepository;
