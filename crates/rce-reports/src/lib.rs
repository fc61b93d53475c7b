// crates/rce-reports/src/lib.rs
// ============================================================================
// Crate: rce-reports
// Description: Report Derivation Pipeline.
// Purpose: spec.md §4.3.
// Dependencies: rce-core, rce-sharding, serde_json, sha2, base64
// ============================================================================

//! ## Overview
//! Every report kind in this crate is a pure function of one
//! [`rce_sharding::ShardsCollection`] plus externally supplied rule catalog
//! and metadata ([`rce_core::interfaces::MetadataRegistry`]). Resources are
//! reconstructed from a part's opaque JSON payload into typed
//! [`resource::CloudResource`] variants ([`resource::reconstruct_part`]),
//! relocated per their resource type or their rule's `global` flag
//! ([`resource::MULTIREGION`]), deduplicated and field-projected
//! ([`dedup::dedup_and_project`]), and from there fed into the digest,
//! details, errors, and rules reports ([`report`]), the coverage and
//! exception-filtering passes ([`coverage`], [`exceptions`]), the
//! statistics aggregation ([`statistics`]), the event-driven diff
//! ([`diff::diff_collection`]), and the SIEM convertors ([`convertors`]).

pub mod convertors;
pub mod coverage;
pub mod dedup;
pub mod diff;
pub mod error;
pub mod exceptions;
pub mod report;
pub mod resource;
pub mod statistics;

pub use convertors::AttachmentMode;
pub use convertors::CloudCustodianItem;
pub use convertors::DojoFinding;
pub use convertors::UdmEntity;
pub use convertors::UdmEvent;
pub use convertors::cloud_custodian_item;
pub use convertors::generic_dojo_finding;
pub use convertors::to_dojo_severity;
pub use convertors::udm_entities;
pub use convertors::udm_events;
pub use coverage::StandardCoverage;
pub use coverage::StandardCoverageCalculator;
pub use coverage::coverage_for_standard;
pub use dedup::dedup_and_project;
pub use diff::CloudDiff;
pub use diff::DiffOptions;
pub use diff::diff_cloud;
pub use diff::diff_collection;
pub use diff::diff_policy;
pub use diff::diff_region;
pub use error::ReportsError;
pub use exceptions::ExceptionFilterResult;
pub use exceptions::filter_exception_resources;
pub use report::DigestReport;
pub use report::digest_report;
pub use report::details_report;
pub use report::errors_report;
pub use report::rules_report;
pub use resource::CloudResource;
pub use resource::reconstruct_part;
pub use statistics::AverageStatistics;
pub use statistics::average_statistics;
pub use statistics::failed_statistics;
