//! Account workflows.
//!
//! Composes the credential store, the confirmation-code registry, and
//! password hashing into the register / login / update-profile /
//! reset-password / delete-account flows. Handlers parse and validate the
//! wire format; this service enforces flow policy.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::{Email, Role, Username};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User, UserPatch};
use crate::services::confirmation::{CodeError, ConfirmationCodes};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A well-formed Argon2id hash of an unknowable password. Login verifies
/// against it when the account doesn't exist so both failure paths do
/// comparable work.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$VE0e3g7DalWHgDwou3nuRA$uC6TER156UQpk0lNQ5+jHM0l5poVjPA1he8TZebqBF4";

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Wrong password or unknown account - never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Confirmation-code verification failed.
    #[error(transparent)]
    Code(#[from] CodeError),

    /// Input failed a flow-level validation rule.
    #[error("{0}")]
    Validation(String),

    /// Self-service paths may only set buyer or seller.
    #[error("role must be buyer or seller")]
    RoleNotAllowed,

    /// Repository/database error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Input for registration, already parsed from the wire format.
#[derive(Debug)]
pub struct Registration {
    pub email: Email,
    pub username: Username,
    pub password: String,
    pub full_name: String,
    pub address: String,
    pub card_number: String,
    pub confirmation_code: String,
}

/// Input for a profile update, already parsed from the wire format.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub support_email: Option<String>,
    pub confirmation_code: String,
    pub new_email_confirmation_code: Option<String>,
}

/// Account workflow service.
pub struct AccountService<'a> {
    users: UserRepository<'a>,
    codes: &'a ConfirmationCodes,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, codes: &'a ConfirmationCodes) -> Self {
        Self {
            users: UserRepository::new(pool),
            codes,
        }
    }

    /// Register a new account.
    ///
    /// Requires a confirmation code verified against the target email. The
    /// role is always `buyer`; sellers upgrade through profile update. The
    /// code is consumed only after the insert commits, so a conflict leaves
    /// it usable for a corrected retry.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Code` if the confirmation code fails,
    /// `AccountError::Validation` for a weak password, and
    /// `AccountError::Repository` with `Conflict` for duplicate or banned
    /// email/username.
    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        self.codes
            .verify(&registration.email, &registration.confirmation_code)?;

        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                email: registration.email.clone(),
                username: registration.username,
                password_hash,
                role: Role::Buyer,
                full_name: registration.full_name,
                address: registration.address,
                card_number: registration.card_number,
            })
            .await?;

        // Single-use: consume only after the commit
        self.codes.remove(&registration.email);

        Ok(user)
    }

    /// Log in by username or email.
    ///
    /// Username takes precedence when both are given. Unknown account and
    /// wrong password produce the same error, and the absent-account path
    /// still runs one argon2 verification so the two are not separable by
    /// timing.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` on any credential failure.
    pub async fn login(
        &self,
        username: Option<&Username>,
        email: Option<&Email>,
        password: &str,
    ) -> Result<User, AccountError> {
        let credentials = match (username, email) {
            (Some(username), _) => self.users.credentials_by_username(username).await?,
            (None, Some(email)) => self.users.credentials_by_email(email).await?,
            (None, None) => {
                return Err(AccountError::Validation(
                    "username or email and password are required".to_owned(),
                ));
            }
        };

        match credentials {
            Some((user, password_hash)) => {
                verify_password(password, &password_hash)?;
                Ok(user)
            }
            None => {
                // Burn comparable time before answering
                let _ = verify_password(password, DUMMY_PASSWORD_HASH);
                Err(AccountError::InvalidCredentials)
            }
        }
    }

    /// Update the caller's own profile.
    ///
    /// Requires a confirmation code verified against the *current* email;
    /// changing the email additionally requires a second code verified
    /// against the *new* email in the same request. All verification happens
    /// before the single UPDATE, and both codes are consumed only after it
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Code` if either code fails,
    /// `AccountError::RoleNotAllowed` for a role outside buyer/seller, and
    /// `AccountError::Repository` with `Conflict` if a changed email or
    /// username collides.
    pub async fn update_profile(
        &self,
        user: &User,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        self.codes.verify(&user.email, &update.confirmation_code)?;

        let new_email = update
            .email
            .as_ref()
            .filter(|candidate| **candidate != user.email);

        if let Some(new_email) = new_email {
            let new_code = update
                .new_email_confirmation_code
                .as_deref()
                .ok_or_else(|| {
                    AccountError::Validation(
                        "changing the email requires a confirmation code sent to the new address"
                            .to_owned(),
                    )
                })?;
            self.codes.verify(new_email, new_code)?;
        }

        if let Some(role) = update.role
            && !role.is_self_service()
        {
            return Err(AccountError::RoleNotAllowed);
        }

        let password_hash = match update.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let patch = UserPatch {
            email: new_email.cloned(),
            username: update.username,
            password_hash,
            role: update.role,
            full_name: update.full_name,
            address: update.address,
            card_number: update.card_number,
            support_email: update.support_email,
        };

        let updated = self.users.update(user.id, &patch).await?;

        // Both codes are spent only once the update has committed
        self.codes.remove(&user.email);
        if let Some(new_email) = new_email {
            self.codes.remove(new_email);
        }

        Ok(updated)
    }

    /// Reset a password from outside a session.
    ///
    /// The confirmation code proves inbox control. Whether or not the email
    /// maps to an account, the flow reports success and consumes the code -
    /// an unauthenticated caller learns nothing about registration state.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Code` if the code fails and
    /// `AccountError::Validation` for a weak password.
    pub async fn reset_password(
        &self,
        email: &Email,
        confirmation_code: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        self.codes.verify(email, confirmation_code)?;
        validate_password(new_password)?;

        if let Some(user) = self.users.find_by_email(email).await? {
            let password_hash = hash_password(new_password)?;
            self.users.set_password(user.id, &password_hash).await?;
        }

        self.codes.remove(email);
        Ok(())
    }

    /// Delete the caller's account, banning its email.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Code` if the code fails. The ban insert and the
    /// user delete are one transaction in the repository.
    pub async fn delete_account(&self, user: &User, confirmation_code: &str) -> Result<(), AccountError> {
        self.codes.verify(&user.email, confirmation_code)?;
        self.users.delete_and_ban(user.id).await?;
        self.codes.remove(&user.email);
        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AccountError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AccountError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AccountError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AccountError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AccountError::Validation(_))
        ));
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn dummy_hash_parses_and_never_matches() {
        // The absent-account login path depends on this constant staying a
        // well-formed PHC string that no real password hashes to.
        assert!(PasswordHash::new(DUMMY_PASSWORD_HASH).is_ok());
        assert!(matches!(
            verify_password("anything at all", DUMMY_PASSWORD_HASH),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn admin_role_is_not_self_service() {
        // The service rejects it before any database work
        assert!(!Role::Admin.is_self_service());
    }
}
