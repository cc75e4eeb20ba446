//! HTTP route handlers for the Bazaar API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (DB ping)
//!
//! # Auth (core identity surface)
//! GET  /auth/csrf-token            - Issue CSRF token (cookie + body + header)
//! GET  /auth/check-username/{u}    - Username uniqueness probe
//! POST /auth/register              - Create account, auto-login
//! POST /auth/login                 - Establish session
//! POST /auth/confirmation-code     - Issue OTP to an email
//! POST /auth/reset-password        - Set new password, unauthenticated
//! GET  /auth/me                    - Read own profile
//! PUT  /auth/me                    - Update own profile
//! POST /auth/logout                - End session
//! POST /auth/delete-account        - Delete account + ban email
//!
//! # Marketplace collaborators
//! GET  /api/users/{id}             - Public profile
//! GET  /api/categories             - List categories
//! POST /api/categories             - Create category (admin)
//! GET  /api/products               - List products (filters)
//! GET  /api/products/{id}          - Product detail
//! POST /api/products               - Create product (seller)
//! PUT  /api/products/{id}          - Update product (owner)
//! DELETE /api/products/{id}        - Delete product (owner or admin)
//! GET  /api/products/{id}/reviews  - List reviews
//! POST /api/products/{id}/reviews  - Create review (buyer)
//! DELETE /api/reviews/{id}         - Delete review (owner or admin)
//! GET  /api/admin/users            - List users (admin)
//! GET  /api/admin/users/{id}       - User detail (admin)
//! DELETE /api/admin/users/{id}     - Delete user + ban email (admin)
//! ```

pub mod admin;
pub mod auth;
pub mod categories;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// The whole group sits behind the strict per-IP rate limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/csrf-token", get(auth::csrf_token))
        .route("/check-username/{username}", get(auth::check_username))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/confirmation-code", post(auth::send_confirmation_code))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/logout", post(auth::logout))
        .route("/delete-account", post(auth::delete_account))
        .layer(auth_rate_limiter())
}

/// Create the marketplace API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(users::show))
        .route("/categories", get(categories::index).post(categories::create))
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/products/{id}/reviews",
            get(reviews::index).post(reviews::create),
        )
        .route("/reviews/{id}", delete(reviews::delete))
        .route("/admin/users", get(admin::index))
        .route(
            "/admin/users/{id}",
            get(admin::show).delete(admin::delete),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}
