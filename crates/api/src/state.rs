//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{ConfirmationCodes, CsrfTokens, Mailer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources: the database pool, configuration, the confirmation-code
/// registry, the CSRF token service, and the mail sender.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    codes: ConfirmationCodes,
    csrf: CsrfTokens,
    mailer: Mailer,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let codes = ConfirmationCodes::new();
        let csrf = CsrfTokens::new(config.csrf_secret.clone());
        let mailer = Mailer::from_config(config.mail.as_ref());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                codes,
                csrf,
                mailer,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the confirmation-code registry.
    #[must_use]
    pub fn codes(&self) -> &ConfirmationCodes {
        &self.inner.codes
    }

    /// Get a reference to the CSRF token service.
    #[must_use]
    pub fn csrf(&self) -> &CsrfTokens {
        &self.inner.csrf
    }

    /// Get a reference to the mail sender.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
