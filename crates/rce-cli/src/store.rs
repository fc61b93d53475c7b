// crates/rce-cli/src/store.rs
// ============================================================================
// Module: Store Handle
// Description: Opens the sqlite-backed store and exposes the catalog
// repositories subcommands need.
// Purpose: Shared connection setup for rulesource and report commands.
// Dependencies: rce-store-sqlite
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rce_store_sqlite::RuleMetadataRepository;
use rce_store_sqlite::RuleRepository;
use rce_store_sqlite::RuleSourceRepository;
use rce_store_sqlite::SqliteStoreConfig;
use rce_store_sqlite::SqliteStoreError;

/// Bundles the catalog repositories over one shared connection.
pub struct Store {
    pub rules: RuleRepository,
    pub rule_sources: RuleSourceRepository,
    pub rule_metadata: RuleMetadataRepository,
}

impl Store {
    /// Opens `path` and wires up the catalog repositories.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the connection cannot be opened.
    pub fn open(path: &str) -> Result<Self, SqliteStoreError> {
        let config = SqliteStoreConfig::new(path);
        let connection = rce_store_sqlite::open(&config)?;
        let connection = Arc::new(Mutex::new(connection));
        Ok(Self {
            rules: RuleRepository::new(connection.clone()),
            rule_sources: RuleSourceRepository::new(connection.clone()),
            rule_metadata: RuleMetadataRepository::new(connection),
        })
    }
}
