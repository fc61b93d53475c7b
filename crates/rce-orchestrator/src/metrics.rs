// crates/rce-orchestrator/src/metrics.rs
// ============================================================================
// Module: Orchestrator Metrics
// Description: In-process counters for SubmitJob/UpdateJobFromWorker
// outcomes.
// Purpose: Observability parity with the teacher's perf-stats pattern,
// scaled down to counts (no external metrics sink, no histograms).
// Dependencies: std::sync::atomic
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Snapshot of [`JobOrchestratorMetrics`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobOrchestratorMetricsSnapshot {
    pub submitted: u64,
    pub admission_rejected: u64,
    pub worker_updates_applied: u64,
    pub terminal_jobs: u64,
}

/// Counts-only metrics for job admission and lifecycle updates.
#[derive(Debug, Default)]
pub struct JobOrchestratorMetrics {
    submitted: AtomicU64,
    admission_rejected: AtomicU64,
    worker_updates_applied: AtomicU64,
    terminal_jobs: AtomicU64,
}

impl JobOrchestratorMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admission_rejected(&self) {
        self.admission_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_worker_update_applied(&self) {
        self.worker_updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_terminal(&self) {
        self.terminal_jobs.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> JobOrchestratorMetricsSnapshot {
        JobOrchestratorMetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            admission_rejected: self.admission_rejected.load(Ordering::Relaxed),
            worker_updates_applied: self.worker_updates_applied.load(Ordering::Relaxed),
            terminal_jobs: self.terminal_jobs.load(Ordering::Relaxed),
        }
    }
}
