//! User repository for database operations.
//!
//! This is the credential store: identity records live here and every
//! mutation runs inside a transaction so uniqueness checks, ban writes, and
//! deletes stay atomic under concurrent requests.
//!
//! Queries use the runtime sqlx API with `FromRow` mapping so the crate
//! builds without a live database.

use sqlx::PgPool;

use bazaar_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::user::{NewUser, User, UserPatch};

/// Columns backing the [`User`] domain type. The password hash is selected
/// only by the credential lookup.
const USER_COLUMNS: &str = "id, email, username, role, full_name, address, card_number, \
     support_email, created_at, updated_at";

/// Row for credential lookups: the user plus their password hash.
#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// The ban-list check and the insert run in one transaction: a banned
    /// email can never slip in between the check and the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is banned or the
    /// email/username already exists, `RepositoryError::Database` otherwise.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let banned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM banned_emails WHERE email = $1)",
        )
        .bind(&new_user.email)
        .fetch_one(&mut *tx)
        .await?;

        if banned {
            return Err(RepositoryError::Conflict(
                "email address is not available".to_owned(),
            ));
        }

        let user: User = sqlx::query_as(&format!(
            "INSERT INTO users \
                 (email, username, password_hash, role, full_name, address, card_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .bind(&new_user.full_name)
        .bind(&new_user.address)
        .bind(&new_user.card_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        tx.commit().await?;

        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user and their password hash by username.
    ///
    /// Returns `None` if the username doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if the email doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Apply a partial update to a user.
    ///
    /// Only fields present in the patch are changed; everything else is
    /// preserved via COALESCE in a single UPDATE, so a disconnect mid-request
    /// can never leave a half-applied record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if a changed email/username collides.
    pub async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, RepositoryError> {
        let user: Option<User> = sqlx::query_as(&format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 username = COALESCE($3, username), \
                 password_hash = COALESCE($4, password_hash), \
                 role = COALESCE($5, role), \
                 full_name = COALESCE($6, full_name), \
                 address = COALESCE($7, address), \
                 card_number = COALESCE($8, card_number), \
                 support_email = COALESCE($9, support_email), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.email.as_ref())
        .bind(patch.username.as_ref())
        .bind(patch.password_hash.as_ref())
        .bind(patch.role)
        .bind(patch.full_name.as_ref())
        .bind(patch.address.as_ref())
        .bind(patch.card_number.as_ref())
        .bind(patch.support_email.as_ref())
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        user.ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash (password reset).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a user and ban their email, atomically.
    ///
    /// The ban row is written before the delete inside one transaction - a
    /// user is never deleted without leaving a ban trace.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn delete_and_ban(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let email: Option<String> =
            sqlx::query_scalar("SELECT email FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(email) = email else {
            return Err(RepositoryError::NotFound);
        };

        sqlx::query("INSERT INTO banned_emails (email) VALUES ($1) ON CONFLICT (email) DO NOTHING")
            .bind(&email)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Whether an email is on the ban list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_email_banned(&self, email: &Email) -> Result<bool, RepositoryError> {
        let banned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM banned_emails WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(banned)
    }

    /// Whether a username is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_taken(&self, username: &Username) -> Result<bool, RepositoryError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(self.pool)
                .await?;

        Ok(taken)
    }

    /// List all users, oldest first (admin dashboard).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}
