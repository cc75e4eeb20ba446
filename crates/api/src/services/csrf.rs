//! CSRF token service.
//!
//! Double-submit tokens: a signed, expiring value is set as a cookie and
//! must be echoed back by the client in the `X-CSRF-Token` header on every
//! state-changing request. Verification recomputes the signature, checks the
//! expiry, and requires the cookie-carried and client-echoed values to match
//! byte for byte. Everything fails closed.
//!
//! Token format: `<expiry-unix>.<nonce-b64url>.<mac-hex>` with
//! MAC = HMAC-SHA256(secret, `<expiry-unix>.<nonce-b64url>`).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued token stays valid.
pub const TOKEN_TTL_SECONDS: i64 = 3600;

/// Name of the cookie carrying the token.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Name of the request/response header carrying the token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Reasons a request fails CSRF verification.
///
/// All variants collapse to one 401 at the boundary; the split exists for
/// logs and tests only.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    /// Cookie or header absent from the request.
    #[error("csrf token missing")]
    Missing,
    /// Cookie-carried and client-echoed values differ.
    #[error("csrf cookie/header mismatch")]
    Mismatch,
    /// Token does not have the expected shape.
    #[error("csrf token malformed")]
    Malformed,
    /// Signature does not verify against the configured secret.
    #[error("csrf token signature invalid")]
    BadSignature,
    /// Token validity window has elapsed.
    #[error("csrf token expired")]
    Expired,
}

/// Issues and verifies anti-forgery tokens bound to one signing secret.
#[derive(Clone)]
pub struct CsrfTokens {
    key: SecretString,
    ttl: TimeDelta,
}

impl CsrfTokens {
    /// Create a token service with the standard TTL.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            key: secret,
            ttl: TimeDelta::seconds(TOKEN_TTL_SECONDS),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length")
    }

    /// Issue a fresh token.
    #[must_use]
    pub fn issue(&self) -> String {
        self.issue_at(Utc::now())
    }

    fn issue_at(&self, now: DateTime<Utc>) -> String {
        let expiry = (now + self.ttl).timestamp();
        let nonce = URL_SAFE_NO_PAD.encode(rand::rng().random::<[u8; 16]>());
        let payload = format!("{expiry}.{nonce}");

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());

        format!("{payload}.{tag}")
    }

    /// Verify the double-submit pair from an incoming request.
    ///
    /// # Errors
    ///
    /// Fails closed with the specific [`CsrfError`]: any missing, mismatched,
    /// malformed, forged, or expired token denies the request.
    pub fn verify(
        &self,
        cookie_value: Option<&str>,
        header_value: Option<&str>,
    ) -> Result<(), CsrfError> {
        self.verify_at(cookie_value, header_value, Utc::now())
    }

    fn verify_at(
        &self,
        cookie_value: Option<&str>,
        header_value: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CsrfError> {
        let cookie = cookie_value.ok_or(CsrfError::Missing)?;
        let header = header_value.ok_or(CsrfError::Missing)?;

        // Double-submit: both carriers must agree before anything else
        if cookie != header {
            return Err(CsrfError::Mismatch);
        }

        let (payload, tag_hex) = cookie.rsplit_once('.').ok_or(CsrfError::Malformed)?;
        let (expiry_str, _nonce) = payload.split_once('.').ok_or(CsrfError::Malformed)?;
        let expiry: i64 = expiry_str.parse().map_err(|_| CsrfError::Malformed)?;
        let tag = hex::decode(tag_hex).map_err(|_| CsrfError::Malformed)?;

        // Authenticity before expiry: an attacker shouldn't learn whether a
        // forged token would have been fresh. Constant-time comparison.
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).map_err(|_| CsrfError::BadSignature)?;

        if now.timestamp() > expiry {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> CsrfTokens {
        CsrfTokens::new(SecretString::from("0123456789abcdef0123456789abcdef"))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn issued_token_verifies() {
        let csrf = service();
        let token = csrf.issue_at(t0());
        assert_eq!(csrf.verify_at(Some(&token), Some(&token), t0()), Ok(()));
    }

    #[test]
    fn missing_cookie_or_header_denies() {
        let csrf = service();
        let token = csrf.issue_at(t0());
        assert_eq!(
            csrf.verify_at(None, Some(&token), t0()),
            Err(CsrfError::Missing)
        );
        assert_eq!(
            csrf.verify_at(Some(&token), None, t0()),
            Err(CsrfError::Missing)
        );
    }

    #[test]
    fn cookie_header_disagreement_denies() {
        let csrf = service();
        let a = csrf.issue_at(t0());
        let b = csrf.issue_at(t0());
        // Both tokens are individually valid; the pair still fails
        assert_eq!(
            csrf.verify_at(Some(&a), Some(&b), t0()),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn expired_token_denies() {
        let csrf = service();
        let token = csrf.issue_at(t0());
        let late = t0() + TimeDelta::seconds(TOKEN_TTL_SECONDS + 1);
        assert_eq!(
            csrf.verify_at(Some(&token), Some(&token), late),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn tampered_payload_denies() {
        let csrf = service();
        let token = csrf.issue_at(t0());
        // Push the expiry a digit longer; signature no longer matches
        let tampered = format!("9{token}");
        assert_eq!(
            csrf.verify_at(Some(&tampered), Some(&tampered), t0()),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn tampered_signature_denies() {
        let csrf = service();
        let token = csrf.issue_at(t0());
        let flipped = if token.ends_with('0') {
            format!("{}1", &token[..token.len() - 1])
        } else {
            format!("{}0", &token[..token.len() - 1])
        };
        assert_eq!(
            csrf.verify_at(Some(&flipped), Some(&flipped), t0()),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let csrf = service();
        for garbage in ["", "abc", "a.b", "notanumber.nonce.00ff"] {
            let result = csrf.verify_at(Some(garbage), Some(garbage), t0());
            assert!(
                matches!(result, Err(CsrfError::Malformed | CsrfError::BadSignature)),
                "{garbage:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn token_from_another_secret_denies() {
        let csrf = service();
        let other = CsrfTokens::new(SecretString::from("ffffffffffffffffffffffffffffffff"));
        let token = other.issue_at(t0());
        assert_eq!(
            csrf.verify_at(Some(&token), Some(&token), t0()),
            Err(CsrfError::BadSignature)
        );
    }

    #[test]
    fn sentinel_values_are_rejected() {
        // No hard-coded placeholder may ever pass verification
        let csrf = service();
        let sentinel = "InvalidCsrfToken";
        assert!(
            csrf.verify_at(Some(sentinel), Some(sentinel), t0())
                .is_err()
        );
    }
}
