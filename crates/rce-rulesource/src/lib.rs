// crates/rce-rulesource/src/lib.rs
// ============================================================================
// Module: Rule-Source Syncer
// Description: Public API surface for the git-origin rule catalog syncer.
// Purpose: Tarball pull, policy extraction/validation, blame-stamping, and
// diff/upsert/status tracking (spec.md §4.6).
// Dependencies: crate::{archive, syncer, transport_http, transport_memory}
// ============================================================================

//! ## Overview
//! The syncer pulls a rule-source's tree as a tarball, extracts and
//! validates YAML policy documents against the `Rule` schema, stamps each
//! surviving rule with blame information, and diffs the result against the
//! existing catalog for this rule-source.

pub mod archive;
pub mod syncer;
pub mod transport_http;
pub mod transport_memory;

pub use archive::ArchiveError;
pub use archive::YamlFile;
pub use archive::extract_rules;
pub use archive::extract_yaml_files;
pub use archive::read_version_files;
pub use syncer::SyncError;
pub use syncer::SyncOutcome;
pub use syncer::sync_rule_source;
pub use transport_http::GitHostKind;
pub use transport_http::HttpGitHostClient;
pub use transport_memory::InMemoryGitHostClient;
