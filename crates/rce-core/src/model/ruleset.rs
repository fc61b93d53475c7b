// crates/rce-core/src/model/ruleset.rs
// ============================================================================
// Module: Ruleset
// Description: Named, versioned snapshot of rule names for one cloud.
// Purpose: Canonical type for spec.md §3 Ruleset.
// Dependencies: crate::identifiers, std::collections::BTreeSet, serde
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::LicenseKey;
use crate::identifiers::RuleName;
use crate::identifiers::RulesetName;
use crate::identifiers::RulesetVersion;
use crate::model::tenant::Cloud;

/// Pointer to a compiled ruleset artifact in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePointer {
    pub bucket: String,
    pub key: String,
}

/// A named snapshot of a set of rule names for one cloud.
///
/// # Invariants
/// - Identity is `(customer, name, version)`.
/// - If `licensed` is true, `license_keys` MUST NOT be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    pub customer_id: CustomerId,
    pub name: RulesetName,
    pub version: RulesetVersion,
    pub cloud: Cloud,
    pub rule_names: BTreeSet<RuleName>,
    pub licensed: bool,
    pub license_keys: Vec<LicenseKey>,
    pub artifact: Option<StoragePointer>,
}

impl Ruleset {
    /// Validates the licensed-ruleset invariant.
    ///
    /// # Errors
    /// Returns an error message when `licensed` is set but no license key is
    /// attached.
    pub fn validate(&self) -> Result<(), String> {
        if self.licensed && self.license_keys.is_empty() {
            return Err(format!(
                "ruleset {}/{}:{} is licensed but has no license keys",
                self.customer_id, self.name, self.version
            ));
        }
        Ok(())
    }

    /// Removes the license key; `licensed` drops to false when the key list
    /// is left empty, mirroring the cascade-delete rule of spec.md §4.5.
    pub fn detach_license(&mut self, key: &LicenseKey) {
        self.license_keys.retain(|k| k != key);
        if self.license_keys.is_empty() {
            self.licensed = false;
        }
    }
}
