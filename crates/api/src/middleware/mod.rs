//! HTTP middleware: sessions, authentication extractors, CSRF verification,
//! and rate limiting.

pub mod auth;
pub mod csrf;
pub mod rate_limit;
pub mod session;

pub use auth::{
    RequireAdmin, RequireBuyer, RequireSeller, RequireUser, destroy_session, establish_session,
    may_delete_owned,
};
pub use csrf::require_csrf;
pub use rate_limit::auth_rate_limiter;
pub use session::create_session_layer;
