// crates/rce-license/src/transport_memory.rs
// ============================================================================
// Module: In-Memory License Manager Transport
// Description: LicenseManagerTransport fake for tests.
// Purpose: Exercise LicenseClient logic without a real License Manager.
// Dependencies: rce-core, async-trait, tokio::sync::Mutex
// ============================================================================

use async_trait::async_trait;
use rce_core::interfaces::LicenseManagerTransport;
use rce_core::interfaces::LicenseTransportError;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;

/// Records every call made through it and returns canned responses,
/// advertising a fixed `Accept-Version`.
pub struct InMemoryLicenseManagerTransport {
    accept_version: String,
    sync_response: Value,
    check_permission_response: Value,
    calls: Mutex<Vec<String>>,
}

impl InMemoryLicenseManagerTransport {
    #[must_use]
    pub fn new(accept_version: impl Into<String>) -> Self {
        Self {
            accept_version: accept_version.into(),
            sync_response: json!({}),
            check_permission_response: json!({ "allowed": [] }),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_sync_response(mut self, response: Value) -> Self {
        self.sync_response = response;
        self
    }

    #[must_use]
    pub fn with_check_permission_response(mut self, response: Value) -> Self {
        self.check_permission_response = response;
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: &str) {
        self.calls.lock().await.push(call.to_string());
    }
}

#[async_trait]
impl LicenseManagerTransport for InMemoryLicenseManagerTransport {
    async fn whoami(&self, _token: &str) -> Result<String, LicenseTransportError> {
        self.record("whoami").await;
        Ok(self.accept_version.clone())
    }

    async fn sync_license(
        &self,
        _token: &str,
        _license_key: &str,
    ) -> Result<Value, LicenseTransportError> {
        self.record("sync_license").await;
        Ok(self.sync_response.clone())
    }

    async fn post_job(&self, _token: &str, body: Value) -> Result<Value, LicenseTransportError> {
        self.record("post_job").await;
        Ok(body)
    }

    async fn patch_job(&self, _token: &str, body: Value) -> Result<Value, LicenseTransportError> {
        self.record("patch_job").await;
        Ok(body)
    }

    async fn check_permission(
        &self,
        _token: &str,
        _body: Value,
    ) -> Result<Value, LicenseTransportError> {
        self.record("check_permission").await;
        Ok(self.check_permission_response.clone())
    }

    async fn set_activation_date(
        &self,
        _token: &str,
        _body: Value,
    ) -> Result<(), LicenseTransportError> {
        self.record("set_activation_date").await;
        Ok(())
    }

    async fn publish_ruleset(
        &self,
        _token: &str,
        body: Value,
    ) -> Result<Value, LicenseTransportError> {
        self.record("publish_ruleset").await;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn whoami_returns_configured_version() {
        let transport = InMemoryLicenseManagerTransport::new("2.9");
        assert_eq!(transport.whoami("tok").await.expect("whoami"), "2.9");
        assert_eq!(transport.calls().await, vec!["whoami".to_string()]);
    }

    #[tokio::test]
    async fn post_job_echoes_body() {
        let transport = InMemoryLicenseManagerTransport::new("3.1");
        let body = json!({ "job_id": "j-1" });
        let response = transport.post_job("tok", body.clone()).await.expect("post");
        assert_eq!(response, body);
    }
}
