//! Confirmation-code registry.
//!
//! Proves short-term possession of an email inbox: a 6-digit code is issued,
//! emailed, and verified within a fixed time-to-live. At most one code is
//! outstanding per email - issuing again supersedes the previous code.
//!
//! Codes live in process memory only; a restart invalidates them all, which
//! is accepted (they are short-lived by nature). The store is a bounded
//! concurrent cache whose per-key compute API makes verify-and-purge atomic
//! against racing requests for the same email.
//!
//! Successful verification does NOT consume the code: the profile-update
//! flow needs the same code valid across both its checks. Flows with
//! single-use semantics (register, reset-password, delete-account) call
//! [`ConfirmationCodes::remove`] once their transaction commits.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::ops::compute::Op;
use moka::sync::Cache;
use rand::Rng;
use thiserror::Error;

use bazaar_core::Email;

/// How long an issued code stays valid.
pub const CODE_TTL_SECONDS: i64 = 300;

/// Cache capacity bound; far above any plausible number of in-flight codes.
const MAX_OUTSTANDING_CODES: u64 = 100_000;

/// Verification failures, surfaced to the user for feedback.
///
/// The wording never reveals whether the email has an account - only whether
/// a code was requested for it recently.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodeError {
    /// No code is on record for this email.
    #[error("confirmation code not found for this email")]
    NotFound,
    /// The code's time-to-live has elapsed.
    #[error("confirmation code has expired")]
    Expired,
    /// The supplied code differs from the stored one.
    #[error("invalid confirmation code")]
    Mismatch,
}

#[derive(Debug, Clone)]
struct StoredCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Process-wide registry of outstanding confirmation codes, keyed by email.
///
/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct ConfirmationCodes {
    cache: Cache<String, StoredCode>,
    ttl: TimeDelta,
}

impl ConfirmationCodes {
    /// Create a registry with the standard TTL.
    #[must_use]
    pub fn new() -> Self {
        // The cache-level TTL is a garbage-collection backstop set above the
        // logical expiry; verification checks the stored timestamp itself.
        let cache = Cache::builder()
            .max_capacity(MAX_OUTSTANDING_CODES)
            .time_to_live(Duration::from_secs(2 * CODE_TTL_SECONDS as u64))
            .build();
        Self {
            cache,
            ttl: TimeDelta::seconds(CODE_TTL_SECONDS),
        }
    }

    /// Issue a fresh code for an email, superseding any outstanding one.
    ///
    /// The code is drawn from the OS-seeded CSPRNG, not a time-seeded
    /// generator.
    pub fn issue(&self, email: &Email) -> String {
        self.issue_at(email, Utc::now())
    }

    fn issue_at(&self, email: &Email, now: DateTime<Utc>) -> String {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        self.cache.insert(
            email.as_str().to_owned(),
            StoredCode {
                code: code.clone(),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Verify a code for an email.
    ///
    /// # Errors
    ///
    /// - [`CodeError::NotFound`] when no code is on record
    /// - [`CodeError::Expired`] when the TTL has elapsed (the stale record is
    ///   purged as a side effect)
    /// - [`CodeError::Mismatch`] when the supplied code differs
    pub fn verify(&self, email: &Email, code: &str) -> Result<(), CodeError> {
        self.verify_at(email, code, Utc::now())
    }

    /// Verification against an explicit clock; drives [`Self::verify`] and
    /// the expiry tests.
    fn verify_at(&self, email: &Email, code: &str, now: DateTime<Utc>) -> Result<(), CodeError> {
        let mut outcome: Result<(), CodeError> = Err(CodeError::NotFound);

        // Single per-key compute: racing verifies for one email serialize
        // here, so the expiry purge happens exactly once.
        let _ = self
            .cache
            .entry(email.as_str().to_owned())
            .and_compute_with(|entry| match entry {
                None => Op::Nop,
                Some(entry) => {
                    let stored = entry.into_value();
                    if now > stored.expires_at {
                        outcome = Err(CodeError::Expired);
                        Op::Remove
                    } else if stored.code == code {
                        outcome = Ok(());
                        Op::Nop
                    } else {
                        outcome = Err(CodeError::Mismatch);
                        Op::Nop
                    }
                }
            });

        outcome
    }

    /// Remove the outstanding code for an email. Idempotent.
    pub fn remove(&self, email: &Email) {
        self.cache.invalidate(email.as_str());
    }
}

impl Default for ConfirmationCodes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn issued_code_is_six_digits() {
        let codes = ConfirmationCodes::new();
        let code = codes.issue(&email("a@x.com"));
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn verify_within_ttl_succeeds() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");
        let code = codes.issue_at(&addr, t0());

        let just_before_expiry = t0() + TimeDelta::seconds(CODE_TTL_SECONDS);
        assert_eq!(codes.verify_at(&addr, &code, just_before_expiry), Ok(()));
    }

    #[test]
    fn success_does_not_consume_the_code() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");
        let code = codes.issue_at(&addr, t0());

        assert_eq!(codes.verify_at(&addr, &code, t0()), Ok(()));
        assert_eq!(codes.verify_at(&addr, &code, t0()), Ok(()));
    }

    #[test]
    fn verify_past_ttl_expires_and_purges() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");
        let code = codes.issue_at(&addr, t0());

        let late = t0() + TimeDelta::seconds(CODE_TTL_SECONDS + 1);
        assert_eq!(
            codes.verify_at(&addr, &code, late),
            Err(CodeError::Expired)
        );
        // The stale record is gone, not still expiring
        assert_eq!(
            codes.verify_at(&addr, &code, late),
            Err(CodeError::NotFound)
        );
    }

    #[test]
    fn wrong_code_is_a_mismatch_and_survives() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");
        let code = codes.issue_at(&addr, t0());

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert_eq!(
            codes.verify_at(&addr, wrong, t0()),
            Err(CodeError::Mismatch)
        );
        // A wrong guess doesn't burn the real code
        assert_eq!(codes.verify_at(&addr, &code, t0()), Ok(()));
    }

    #[test]
    fn reissue_supersedes_previous_code() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");

        // Collision between two random 6-digit codes is possible; force
        // distinct codes by reissuing until they differ.
        let first = codes.issue_at(&addr, t0());
        let second = loop {
            let second = codes.issue_at(&addr, t0());
            if second != first {
                break second;
            }
        };

        assert_eq!(
            codes.verify_at(&addr, &first, t0()),
            Err(CodeError::Mismatch)
        );
        assert_eq!(codes.verify_at(&addr, &second, t0()), Ok(()));
    }

    #[test]
    fn unknown_email_is_not_found() {
        let codes = ConfirmationCodes::new();
        assert_eq!(
            codes.verify_at(&email("nobody@x.com"), "123456", t0()),
            Err(CodeError::NotFound)
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");
        let code = codes.issue_at(&addr, t0());

        codes.remove(&addr);
        codes.remove(&addr);
        assert_eq!(
            codes.verify_at(&addr, &code, t0()),
            Err(CodeError::NotFound)
        );
    }

    #[test]
    fn expire_reissue_verify_consume_scenario() {
        let codes = ConfirmationCodes::new();
        let addr = email("a@x.com");

        // Issue, wait past TTL, expect Expired
        let code = codes.issue_at(&addr, t0());
        let late = t0() + TimeDelta::seconds(CODE_TTL_SECONDS + 60);
        assert_eq!(
            codes.verify_at(&addr, &code, late),
            Err(CodeError::Expired)
        );

        // Reissue and verify immediately
        let fresh = codes.issue_at(&addr, late);
        assert_eq!(codes.verify_at(&addr, &fresh, late), Ok(()));

        // Single-use flows remove after acting on success
        codes.remove(&addr);
        assert_eq!(
            codes.verify_at(&addr, &fresh, late),
            Err(CodeError::NotFound)
        );
    }

    #[test]
    fn codes_are_independent_per_email() {
        let codes = ConfirmationCodes::new();
        let a = email("a@x.com");
        let b = email("b@x.com");

        let code_a = codes.issue_at(&a, t0());
        codes.issue_at(&b, t0());

        codes.remove(&b);
        assert_eq!(codes.verify_at(&a, &code_a, t0()), Ok(()));
    }
}
