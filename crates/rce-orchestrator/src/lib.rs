// crates/rce-orchestrator/src/lib.rs
// ============================================================================
// Crate: rce-orchestrator
// Description: Job admission, dispatch, and lifecycle update.
// Purpose: spec.md §4.1 Job Orchestrator.
// Dependencies: rce-core, rce-license, rce-store-sqlite, tracing
// ============================================================================

pub mod error;
pub mod metrics;
pub mod orchestrator;

pub use error::OrchestratorError;
pub use metrics::JobOrchestratorMetrics;
pub use metrics::JobOrchestratorMetricsSnapshot;
pub use orchestrator::JobOrchestrator;
pub use orchestrator::SubmitJobRequest;
pub use orchestrator::WorkerReportDetail;
