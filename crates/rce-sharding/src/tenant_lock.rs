// crates/rce-sharding/src/tenant_lock.rs
// ============================================================================
// Module: Tenant Write Lock Registry
// Description: Per-tenant advisory lock serializing writes to a tenant's
// `latest/` object-store state.
// Purpose: spec.md §4.2/§5 — "Writes to latest/ are serialized by taking a
// per-tenant advisory lock; readers never block writers."
// Dependencies: rce-core, tokio::sync::Mutex
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use rce_core::identifiers::TenantId;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

/// Hands out one `tokio::sync::Mutex` per tenant, created lazily on first
/// use. Only the `latest/` write path takes this lock; readers never block
/// on it.
#[derive(Default)]
pub struct TenantWriteLocks {
    locks: StdMutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantWriteLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the advisory lock for `tenant`, serializing against any
    /// other writer currently holding it for the same tenant.
    pub async fn acquire(&self, tenant: &TenantId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().expect("tenant lock registry poisoned");
            locks.entry(tenant.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn distinct_tenants_do_not_contend() {
        let locks = TenantWriteLocks::new();
        let a = TenantId::new("tenant-a");
        let b = TenantId::new("tenant-b");

        let guard_a = locks.acquire(&a).await;
        let guard_b = locks.acquire(&b).await;
        drop(guard_a);
        drop(guard_b);
    }

    #[tokio::test]
    async fn same_tenant_serializes() {
        let locks = Arc::new(TenantWriteLocks::new());
        let tenant = TenantId::new("tenant-a");

        let guard = locks.acquire(&tenant).await;
        let locks2 = locks.clone();
        let tenant2 = tenant.clone();
        let handle = tokio::spawn(async move {
            let _guard = locks2.acquire(&tenant2).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "second acquire should block while the first guard is held");
        drop(guard);
        handle.await.expect("task");
    }
}
