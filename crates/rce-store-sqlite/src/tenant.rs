// crates/rce-store-sqlite/src/tenant.rs
// ============================================================================
// Module: Tenant & Customer Repositories
// Description: CRUD over the tenants/customers tables.
// Purpose: spec.md §3 Tenant/Customer persistence.
// Dependencies: rusqlite, serde_json, rce-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rce_core::identifiers::CustomerId;
use rce_core::identifiers::TenantId;
use rce_core::model::Customer;
use rce_core::model::Tenant;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

/// Repository for [`Tenant`] records.
#[derive(Clone)]
pub struct TenantRepository {
    connection: Arc<Mutex<Connection>>,
}

impl TenantRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, tenant: &Tenant) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(tenant).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO tenants (id, customer_id, json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET customer_id = excluded.customer_id, json = excluded.json",
                params![tenant.id.as_str(), tenant.customer_id.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: &TenantId) -> Result<Option<Tenant>, SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM tenants WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn list_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<Tenant>, SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare("SELECT json FROM tenants WHERE customer_id = ?1")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![customer_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        rows.map(|row| {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .collect()
    }
}

/// Repository for [`Customer`] records.
#[derive(Clone)]
pub struct CustomerRepository {
    connection: Arc<Mutex<Connection>>,
}

impl CustomerRepository {
    #[must_use]
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn upsert(&self, customer: &Customer) -> Result<(), SqliteStoreError> {
        let json = serde_json::to_vec(customer).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO customers (id, json) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET json = excluded.json",
                params![customer.id.as_str(), json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns [`SqliteStoreError::Db`] on backend failure.
    pub fn get(&self, id: &CustomerId) -> Result<Option<Customer>, SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))?;
        let row: Option<Vec<u8>> = guard
            .query_row("SELECT json FROM customers WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use rce_core::model::Cloud;

    use super::*;
    use crate::connection;

    fn repo() -> TenantRepository {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = connection::SqliteStoreConfig::new(dir.path().join("store.db"));
        let conn = connection::open(&config).expect("open");
        std::mem::forget(dir);
        TenantRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let repo = repo();
        let tenant = Tenant {
            id: TenantId::new("tenant-1"),
            customer_id: CustomerId::new("cust-1"),
            cloud: Cloud::Aws,
            native_id: "123456789012".to_string(),
            active_regions: vec!["us-east-1".to_string()],
            active: true,
            activated_at: chrono::Utc::now(),
        };
        repo.upsert(&tenant).expect("upsert");
        let loaded = repo.get(&tenant.id).expect("get").expect("present");
        assert_eq!(loaded.native_id, "123456789012");
    }

    #[test]
    fn get_missing_returns_none() {
        let repo = repo();
        assert!(repo.get(&TenantId::new("missing")).expect("get").is_none());
    }
}
