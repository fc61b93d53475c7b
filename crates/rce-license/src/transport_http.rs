// crates/rce-license/src/transport_http.rs
// ============================================================================
// Module: HTTP License Manager Transport
// Description: reqwest-backed LicenseManagerTransport.
// Purpose: The production shape of the six endpoints in spec.md §4.5.
// Dependencies: rce-core, async-trait, reqwest, serde_json, tracing
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use rce_core::interfaces::LicenseManagerTransport;
use rce_core::interfaces::LicenseTransportError;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// `LicenseManagerTransport` backed by a real License Manager over HTTP.
pub struct HttpLicenseManagerTransport {
    client: Client,
    base_url: String,
}

impl HttpLicenseManagerTransport {
    /// Builds a transport against `base_url` (e.g.
    /// `https://license-manager.internal`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be
    /// constructed (e.g. an invalid TLS configuration).
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn auth_header(token: &str) -> String {
        format!("Bearer {token}")
    }

    async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: Value,
    ) -> Result<Value, LicenseTransportError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", Self::auth_header(token))
            .json(&body)
            .send()
            .await
            .map_err(|err| LicenseTransportError::Unavailable(err.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<Value>()
                .await
                .map_err(|err| LicenseTransportError::InvalidData(err.to_string())),
            StatusCode::FORBIDDEN => Err(LicenseTransportError::Forbidden),
            StatusCode::NOT_FOUND => Err(LicenseTransportError::NotFound),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let message = response.text().await.unwrap_or_default();
                Err(LicenseTransportError::InvalidData(message))
            }
            status => Err(LicenseTransportError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }
}

#[async_trait]
impl LicenseManagerTransport for HttpLicenseManagerTransport {
    async fn whoami(&self, token: &str) -> Result<String, LicenseTransportError> {
        let response = self
            .client
            .get(self.url("/whoami"))
            .header("Authorization", Self::auth_header(token))
            .send()
            .await
            .map_err(|err| LicenseTransportError::Unavailable(err.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .headers()
                .get("Accept-Version")
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string)
                .ok_or_else(|| {
                    LicenseTransportError::InvalidData("missing Accept-Version header".into())
                }),
            StatusCode::FORBIDDEN => Err(LicenseTransportError::Forbidden),
            status => Err(LicenseTransportError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }

    async fn sync_license(
        &self,
        token: &str,
        license_key: &str,
    ) -> Result<Value, LicenseTransportError> {
        self.post_json("/license/sync", token, json!({ "license_key": license_key }))
            .await
    }

    async fn post_job(&self, token: &str, body: Value) -> Result<Value, LicenseTransportError> {
        self.post_json("/jobs", token, body).await
    }

    async fn patch_job(&self, token: &str, body: Value) -> Result<Value, LicenseTransportError> {
        let response = self
            .client
            .patch(self.url("/jobs"))
            .header("Authorization", Self::auth_header(token))
            .json(&body)
            .send()
            .await
            .map_err(|err| LicenseTransportError::Unavailable(err.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<Value>()
                .await
                .map_err(|err| LicenseTransportError::InvalidData(err.to_string())),
            StatusCode::FORBIDDEN => Err(LicenseTransportError::Forbidden),
            StatusCode::NOT_FOUND => Err(LicenseTransportError::NotFound),
            status => Err(LicenseTransportError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }

    async fn check_permission(
        &self,
        token: &str,
        body: Value,
    ) -> Result<Value, LicenseTransportError> {
        self.post_json("/jobs/check-permission", token, body).await
    }

    async fn set_activation_date(
        &self,
        token: &str,
        body: Value,
    ) -> Result<(), LicenseTransportError> {
        self.post_json("/customers/set-activation-date", token, body)
            .await
            .map(|_| ())
    }

    async fn publish_ruleset(
        &self,
        token: &str,
        body: Value,
    ) -> Result<Value, LicenseTransportError> {
        self.post_json("/registry/ruleset", token, body).await
    }
}
