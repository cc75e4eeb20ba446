//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -e admin@example.com -u admin1 -n "Admin Name"
//! ```
//!
//! The `admin` role is never assignable through the API's self-service
//! paths; this command is how the first (and any further) admin account
//! comes to exist.
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::{Email, Username};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid username.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Missing password in a non-interactive context.
    #[error("A password is required (pass it with --password)")]
    MissingPassword,

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// User already exists.
    #[error("A user already exists with that email or username")]
    UserExists,
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `username` - Admin's username
/// * `full_name` - Admin's display name
/// * `password` - Admin's password
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns `AdminError` for invalid input, a duplicate account, or a
/// database failure.
pub async fn create_user(
    email: &str,
    username: &str,
    full_name: &str,
    password: Option<&str>,
) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let username =
        Username::parse(username).map_err(|e| AdminError::InvalidUsername(e.to_string()))?;
    let password = password.ok_or(AdminError::MissingPassword)?;

    let database_url = std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| AdminError::MissingEnvVar("BAZAAR_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating admin user: {} ({})", username, email);

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AdminError::PasswordHash)?
        .to_string();

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, username, password_hash, role, full_name) \
         VALUES ($1, $2, $3, 'admin', $4) \
         RETURNING id",
    )
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(full_name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return AdminError::UserExists;
        }
        AdminError::Database(e)
    })?;

    Ok(user_id)
}
