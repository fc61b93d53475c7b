// crates/rce-license/src/lib.rs
// ============================================================================
// Module: License Client
// Description: Public API surface for the License Client.
// Purpose: Token signing/caching, version negotiation, the tenant->license
// selection wiring, and both transport implementations.
// Dependencies: crate::{client, token, transport_http, transport_memory,
// version}
// ============================================================================

//! ## Overview
//! The License Client is the sole caller of the License Manager. It signs
//! and caches short-lived tokens per customer, negotiates which endpoint
//! shapes the server supports, and resolves which of a tenant's linked
//! licenses applies (spec.md §4.1, §4.5).

pub mod client;
pub mod token;
pub mod transport_http;
pub mod transport_memory;
pub mod version;

pub use client::LicenseClient;
pub use client::LicenseClientError;
pub use client::cascade_license_removal;
pub use client::resolve_license_for_tenant;
pub use token::DEFAULT_TOKEN_TTL_SECS;
pub use token::HmacTokenSigner;
pub use token::TokenError;
pub use token::TokenSigner;
pub use token::default_expiry;
pub use transport_http::HttpLicenseManagerTransport;
pub use transport_memory::InMemoryLicenseManagerTransport;
pub use version::ClientVariant;
pub use version::negotiate;
