//! Database operations for the Bazaar `PostgreSQL` database.
//!
//! # Tables
//!
//! - `users` - Identity records (email, username, password hash, role, profile)
//! - `banned_emails` - Append-only ban list written on account deletion
//! - `sessions` - tower-sessions storage
//! - `categories`, `products`, `reviews` - Catalog and review data
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod catalog;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::{CategoryRepository, ProductRepository};
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error to `Conflict(message)` when it is a unique violation,
    /// passing everything else through as `Database`.
    ///
    /// The conflict message is chosen by constraint name so callers can tell
    /// the user which field collided without parsing driver output.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            // Taken and banned emails share one message so the response
            // never distinguishes them
            let message = match db_err.constraint() {
                Some(c) if c.contains("username") => "username already exists",
                Some(c) if c.contains("email") => "email address is not available",
                _ => "resource already exists",
            };
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
