// crates/rce-core/src/lib.rs
// ============================================================================
// Module: Rule Engine Core Library
// Description: Public API surface for the compliance scanning platform core.
// Purpose: Expose the data model, identifiers, error taxonomy, and
// collaborator interfaces shared across every crate in the workspace.
// Dependencies: crate::{error, identifiers, interfaces, model, static_registry}
// ============================================================================

//! ## Overview
//! `rce-core` holds everything downstream crates agree on: entity types
//! (§3), identifiers, the error taxonomy (§7), and the collaborator traits
//! (§6) that object storage, worker dispatch, the License Manager, git
//! hosts, the external scheduler, and the metadata registry plug into. It
//! performs no I/O and reads no wall-clock time on its own; callers supply
//! both.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod identifiers;
pub mod interfaces;
pub mod model;
pub mod static_registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::CoreError;
pub use error::ErrorKind;

pub use identifiers::BatchResultId;
pub use identifiers::CelerySlotId;
pub use identifiers::CustomerId;
pub use identifiers::JobId;
pub use identifiers::LicenseKey;
pub use identifiers::ResourceExceptionId;
pub use identifiers::RuleName;
pub use identifiers::RuleSourceId;
pub use identifiers::RulesetName;
pub use identifiers::RulesetVersion;
pub use identifiers::ScheduledJobId;
pub use identifiers::TenantId;

pub use interfaces::BlameInfo;
pub use interfaces::Engine;
pub use interfaces::EngineError;
pub use interfaces::ExternalScheduler;
pub use interfaces::GitHostClient;
pub use interfaces::GitHostError;
pub use interfaces::LicenseManagerTransport;
pub use interfaces::LicenseTransportError;
pub use interfaces::MetadataRegistry;
pub use interfaces::MetadataRegistryError;
pub use interfaces::ObjectListing;
pub use interfaces::ObjectStore;
pub use interfaces::ObjectStoreError;
pub use interfaces::SchedulerError;
pub use interfaces::SecretStore;
pub use interfaces::SecretStoreError;
pub use interfaces::WorkerEnv;

pub use model::*;

pub use static_registry::StaticMetadataRegistry;
