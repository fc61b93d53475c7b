// crates/rce-license/src/client.rs
// ============================================================================
// Module: License Client
// Description: Ties token signing/caching, version negotiation, and the
// tenant->license selection algorithm to the LicenseManagerTransport seam.
// Purpose: spec.md §4.5, §4.1 tenant selection, §6 LicenseManagerTransport.
// Dependencies: rce-core, chrono, serde_json, tracing
// ============================================================================

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use rce_core::identifiers::CustomerId;
use rce_core::identifiers::TenantId;
use rce_core::interfaces::LicenseManagerTransport;
use rce_core::interfaces::LicenseTransportError;
use rce_core::interfaces::SecretStore;
use rce_core::interfaces::SecretStoreError;
use rce_core::model::License;
use rce_core::model::Ruleset;
use rce_core::model::ScopedLicense;
use rce_core::model::select_license_for_tenant;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::token::TokenError;
use crate::token::TokenSigner;
use crate::token::default_expiry;
use crate::version::ClientVariant;
use crate::version::negotiate;

/// Errors raised by [`LicenseClient`] operations.
#[derive(Debug, Error)]
pub enum LicenseClientError {
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("secret store error: {0}")]
    SecretStore(#[from] SecretStoreError),
    #[error("license manager transport error: {0}")]
    Transport(#[from] LicenseTransportError),
    #[error("no license for tenant")]
    NoLicense,
    #[error("ruleset publishing requires License Manager >= 3.0")]
    RulesetPublishingUnsupported,
}

fn secret_name(customer_id: &CustomerId) -> String {
    format!("license-manager-token/{customer_id}")
}

/// Client against the License Manager: handles token caching, version
/// negotiation, and the six endpoints of spec.md §4.5.
pub struct LicenseClient<T, S> {
    transport: T,
    secrets: S,
    signer: Arc<dyn TokenSigner>,
}

impl<T, S> LicenseClient<T, S>
where
    T: LicenseManagerTransport,
    S: SecretStore,
{
    #[must_use]
    pub fn new(transport: T, secrets: S, signer: Arc<dyn TokenSigner>) -> Self {
        Self {
            transport,
            secrets,
            signer,
        }
    }

    /// Returns a valid token for `customer_id`, reusing a cached one if it
    /// has not expired and signing a fresh one otherwise (spec.md §4.5:
    /// "caches a token per customer in the secret store and reuses it if
    /// not expired").
    async fn token_for(&self, customer_id: &CustomerId, now: DateTime<Utc>) -> Result<String, LicenseClientError> {
        let name = secret_name(customer_id);
        match self.secrets.get(&name).await {
            Ok(cached) => Ok(cached),
            Err(SecretStoreError::NotFound(_)) => {
                let token = self
                    .signer
                    .sign(customer_id.as_str(), default_expiry(now))?;
                self.secrets
                    .create(&name, &token, Some(crate::token::DEFAULT_TOKEN_TTL_SECS as u64))
                    .await?;
                Ok(token)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Negotiates the client variant for `customer_id` from `GET /whoami`.
    ///
    /// # Errors
    /// Propagates transport and token errors.
    pub async fn negotiate_variant(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<ClientVariant, LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        let accept_version = self.transport.whoami(&token).await?;
        Ok(negotiate(&accept_version))
    }

    /// `POST /license/sync`.
    pub async fn sync_license(
        &self,
        customer_id: &CustomerId,
        license_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Value, LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        Ok(self.transport.sync_license(&token, license_key).await?)
    }

    /// `POST /jobs`.
    pub async fn post_job(
        &self,
        customer_id: &CustomerId,
        body: Value,
        now: DateTime<Utc>,
    ) -> Result<Value, LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        Ok(self.transport.post_job(&token, body).await?)
    }

    /// `PATCH /jobs`. Best-effort: callers (the orchestrator) must tolerate
    /// failure here per §5's "`UpdateJob` abandons silently after
    /// exhaustion and logs at `warn`".
    pub async fn patch_job(
        &self,
        customer_id: &CustomerId,
        body: Value,
        now: DateTime<Utc>,
    ) -> Result<Value, LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        Ok(self.transport.patch_job(&token, body).await?)
    }

    /// Best-effort variant of [`Self::patch_job`] that logs and swallows
    /// errors instead of propagating them.
    pub async fn patch_job_best_effort(
        &self,
        customer_id: &CustomerId,
        body: Value,
        now: DateTime<Utc>,
    ) {
        if let Err(err) = self.patch_job(customer_id, body, now).await {
            warn!(error = %err, "UpdateJob: License Manager patch abandoned");
        }
    }

    /// `POST /jobs/check-permission`. Uses the single-tenant request shape
    /// unless the negotiated variant supports the tenant-list form.
    pub async fn check_permission(
        &self,
        customer_id: &CustomerId,
        tenant_id: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<bool, LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        let variant = negotiate(&self.transport.whoami(&token).await?);
        let body = if variant.supports_tenant_list_permission() {
            json!({ "tenant_ids": [tenant_id.as_str()] })
        } else {
            json!({ "tenant_id": tenant_id.as_str() })
        };
        let response = self.transport.check_permission(&token, body).await?;
        let allowed = response
            .get("allowed")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().any(|id| id.as_str() == Some(tenant_id.as_str())))
            .unwrap_or(false);
        Ok(allowed)
    }

    /// `POST /customers/set-activation-date`.
    pub async fn set_activation_date(
        &self,
        customer_id: &CustomerId,
        activated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LicenseClientError> {
        let token = self.token_for(customer_id, now).await?;
        let body = json!({ "activated_at": activated_at.to_rfc3339() });
        self.transport.set_activation_date(&token, body).await?;
        Ok(())
    }

    /// `POST /registry/ruleset`. Requires `>= 3.0` per version negotiation.
    pub async fn publish_ruleset(
        &self,
        customer_id: &CustomerId,
        body: Value,
        now: DateTime<Utc>,
    ) -> Result<Value, LicenseClientError> {
        let variant = self.negotiate_variant(customer_id, now).await?;
        if !variant.supports_ruleset_publishing() {
            return Err(LicenseClientError::RulesetPublishingUnsupported);
        }
        let token = self.token_for(customer_id, now).await?;
        Ok(self.transport.publish_ruleset(&token, body).await?)
    }
}

/// Resolves the tenant's applicable license from its linked parent records,
/// per spec.md §4.1/§4.5. Purely local selection logic; no transport call.
///
/// # Errors
/// Returns [`LicenseClientError::NoLicense`] when no candidate is
/// non-expired and permitting.
pub fn resolve_license_for_tenant<'a>(
    candidates: &'a [ScopedLicense],
    customer: &CustomerId,
    tenant: &TenantId,
    now: DateTime<Utc>,
) -> Result<&'a License, LicenseClientError> {
    select_license_for_tenant(candidates, customer, tenant, now).ok_or(LicenseClientError::NoLicense)
}

/// Removes `license_key` from every ruleset that references it, detaching
/// rulesets that become unlicensed as a result, per spec.md §3's Ruleset
/// invariant ("a licensed ruleset references at least one license-key") and
/// the cascade-delete contract of a removed License.
pub fn cascade_license_removal(rulesets: &mut [Ruleset], license_key: &rce_core::identifiers::LicenseKey) {
    for ruleset in rulesets.iter_mut() {
        ruleset.detach_license(license_key);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use rce_core::identifiers::LicenseKey;
    use rce_core::identifiers::RulesetName;
    use rce_core::identifiers::RulesetVersion;

    use super::*;
    use crate::token::HmacTokenSigner;
    use crate::transport_memory::InMemoryLicenseManagerTransport;

    #[derive(Default)]
    struct InMemorySecretStore {
        values: Mutex<BTreeMap<String, String>>,
    }

    #[async_trait::async_trait]
    impl SecretStore for InMemorySecretStore {
        async fn create(
            &self,
            name: &str,
            value: &str,
            _ttl_secs: Option<u64>,
        ) -> Result<(), SecretStoreError> {
            self.values
                .lock()
                .expect("lock")
                .insert(name.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, name: &str) -> Result<String, SecretStoreError> {
            self.values
                .lock()
                .expect("lock")
                .get(name)
                .cloned()
                .ok_or_else(|| SecretStoreError::NotFound(name.to_string()))
        }

        async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
            self.values.lock().expect("lock").remove(name);
            Ok(())
        }
    }

    fn test_client() -> LicenseClient<InMemoryLicenseManagerTransport, InMemorySecretStore> {
        LicenseClient::new(
            InMemoryLicenseManagerTransport::new("2.9"),
            InMemorySecretStore::default(),
            Arc::new(HmacTokenSigner::new(b"test-key".to_vec())),
        )
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let client = test_client();
        let customer = CustomerId::new("cust-1");
        let now = Utc::now();
        let first = client.token_for(&customer, now).await.expect("token");
        let second = client.token_for(&customer, now).await.expect("token");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn negotiate_variant_reads_whoami() {
        let client = test_client();
        let customer = CustomerId::new("cust-1");
        let variant = client
            .negotiate_variant(&customer, Utc::now())
            .await
            .expect("negotiate");
        assert_eq!(variant, ClientVariant::TenantList);
    }

    #[tokio::test]
    async fn publish_ruleset_rejected_below_3_0() {
        let client = test_client();
        let customer = CustomerId::new("cust-1");
        let result = client
            .publish_ruleset(&customer, json!({}), Utc::now())
            .await;
        assert!(matches!(
            result,
            Err(LicenseClientError::RulesetPublishingUnsupported)
        ));
    }

    #[test]
    fn cascade_removal_detaches_ruleset_when_last_key_removed() {
        let license_key = LicenseKey::new("lic-1");
        let mut ruleset = Ruleset {
            customer_id: CustomerId::new("cust-1"),
            name: RulesetName::new("ruleset-1"),
            version: RulesetVersion::new("1"),
            cloud: rce_core::model::Cloud::Aws,
            rule_names: std::collections::BTreeSet::new(),
            licensed: true,
            license_keys: vec![license_key.clone()],
            artifact: None,
        };
        cascade_license_removal(std::slice::from_mut(&mut ruleset), &license_key);
        assert!(!ruleset.licensed);
        assert!(ruleset.license_keys.is_empty());
    }
}
