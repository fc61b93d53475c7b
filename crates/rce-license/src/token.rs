// crates/rce-license/src/token.rs
// ============================================================================
// Module: Token Signing
// Description: Short-lived signed tokens presented to the License Manager.
// Purpose: spec.md §4.5 "requests to the License Manager carry a short-lived
// (default 120s) signed token"; SPEC_FULL §4.5 models signing as a trait
// since the original's RS256/JWT scheme has no JWT crate in the example
// pack.
// Dependencies: hmac, sha2, chrono, hex
// ============================================================================

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use thiserror::Error;

/// Default token lifetime, per spec.md §4.5.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 120;

/// Errors signing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing key is invalid")]
    InvalidKey,
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
}

/// Seam for producing a signed token for a customer. A production
/// installation signs with a per-installation private key (RS256/JWT in the
/// original); the HMAC-SHA256 implementation here satisfies the same
/// contract without pulling in a JWT crate, since the signature algorithm
/// itself carries no tested behavior in this scope.
pub trait TokenSigner: Send + Sync {
    /// Produces a signed token asserting `customer_id`, expiring at
    /// `expires_at`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] if the signer's key material is
    /// unusable.
    fn sign(&self, customer_id: &str, expires_at: DateTime<Utc>) -> Result<String, TokenError>;

    /// Recovers the customer id and expiry embedded in a token signed by
    /// this signer, verifying its signature.
    ///
    /// # Errors
    /// Returns [`TokenError::Malformed`] when the signature does not match,
    /// [`TokenError::Expired`] when the embedded expiry has passed.
    fn verify(&self, token: &str) -> Result<(String, DateTime<Utc>), TokenError>;
}

type HmacSha256 = Hmac<Sha256>;

/// `TokenSigner` backed by a shared HMAC-SHA256 key. Token wire form is
/// `{customer_id}.{expires_at_rfc3339}.{hex(hmac)}`.
pub struct HmacTokenSigner {
    key: Vec<u8>,
}

impl HmacTokenSigner {
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| TokenError::InvalidKey)
    }
}

impl TokenSigner for HmacTokenSigner {
    fn sign(&self, customer_id: &str, expires_at: DateTime<Utc>) -> Result<String, TokenError> {
        let payload = format!("{customer_id}.{}", expires_at.to_rfc3339());
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    fn verify(&self, token: &str) -> Result<(String, DateTime<Utc>), TokenError> {
        let mut fields = token.rsplitn(2, '.');
        let signature = fields.next().ok_or(TokenError::Malformed)?;
        let payload = fields.next().ok_or(TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        if expected != signature {
            return Err(TokenError::Malformed);
        }

        let mut parts = payload.splitn(2, '.');
        let customer_id = parts.next().ok_or(TokenError::Malformed)?.to_string();
        let expires_raw = parts.next().ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::parse_from_rfc3339(expires_raw)
            .map_err(|_| TokenError::Malformed)?
            .with_timezone(&Utc);

        if Utc::now() >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok((customer_id, expires_at))
    }
}

/// Convenience for computing the default expiry from `now`.
#[must_use]
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(DEFAULT_TOKEN_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let signer = HmacTokenSigner::new(b"test-key".to_vec());
        let now = Utc::now();
        let token = signer.sign("customer-1", default_expiry(now)).expect("sign");
        let (customer_id, _) = signer.verify(&token).expect("verify");
        assert_eq!(customer_id, "customer-1");
    }

    #[test]
    fn tampered_token_fails_verification() {
        let signer = HmacTokenSigner::new(b"test-key".to_vec());
        let now = Utc::now();
        let mut token = signer.sign("customer-1", default_expiry(now)).expect("sign");
        token.push('x');
        assert!(matches!(signer.verify(&token), Err(TokenError::Malformed)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = HmacTokenSigner::new(b"test-key".to_vec());
        let expired = Utc::now() - Duration::seconds(1);
        let token = signer.sign("customer-1", expired).expect("sign");
        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn different_keys_do_not_cross_verify() {
        let signer_a = HmacTokenSigner::new(b"key-a".to_vec());
        let signer_b = HmacTokenSigner::new(b"key-b".to_vec());
        let token = signer_a
            .sign("customer-1", default_expiry(Utc::now()))
            .expect("sign");
        assert!(matches!(signer_b.verify(&token), Err(TokenError::Malformed)));
    }
}
