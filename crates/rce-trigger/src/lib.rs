// crates/rce-trigger/src/lib.rs
// ============================================================================
// Crate: rce-trigger
// Description: Scheduled & event-driven trigger layer.
// Purpose: spec.md §4.4.
// Dependencies: rce-core, rce-store-sqlite, chrono, sha2, tracing
// ============================================================================

//! ## Overview
//! Two independent trigger paths converge on the same downstream hand-off
//! (spec.md §4.1): a cron scheduler ([`scheduler::CronScheduler`]) managing
//! recurring jobs against an external trigger system, and an event router
//! ([`event_router`]) filtering and mapping cloud audit events into
//! deduplicated [`rce_core::model::BatchResult`] creation requests. Cron
//! syntax validation ([`cron`]) is implemented directly since no cron crate
//! is available in this workspace's dependency set.

pub mod cron;
pub mod error;
pub mod event_router;
pub mod scheduler;

pub use cron::CronSyntaxError;
pub use cron::validate_cron_expression;
pub use error::TriggerError;
pub use event_router::CloudEventMapping;
pub use event_router::CloudTrailMapping;
pub use event_router::MaestroActionMapping;
pub use event_router::MaestroCloud;
pub use event_router::RoutedBatch;
pub use event_router::RoutingOutcome;
pub use event_router::batch_result_from_routed;
pub use event_router::route_aws_events;
pub use event_router::route_maestro_events;
pub use scheduler::CronScheduler;
pub use scheduler::RegisterJobRequest;
