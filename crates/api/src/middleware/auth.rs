//! Authentication extractors and the authorization gate.
//!
//! Session restoration fails closed: a missing, unsigned, or expired session
//! cookie, or a session pointing at a deleted user, all reject with 401
//! before the handler runs. Role extractors layer 403 checks on top.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bazaar_core::Role;

use crate::db::users::UserRepository;
use crate::error::ApiError;
use crate::models::session::{CurrentUser, session_keys};
use crate::models::user::User;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// The user row is re-read from the database on every request so a deleted
/// account is anonymous immediately, not at session expiry.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // The session is placed in extensions by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)?;

        let current: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(ApiError::Unauthenticated)?;

        let user = UserRepository::new(state.pool())
            .find_by_id(current.id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self(user))
    }
}

/// Extractor that requires the `seller` role.
pub struct RequireSeller(pub User);

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Seller => Ok(Self(user)),
            Role::Buyer | Role::Admin => {
                Err(ApiError::Forbidden("seller role required".to_owned()))
            }
        }
    }
}

/// Extractor that requires the `buyer` role.
pub struct RequireBuyer(pub User);

impl FromRequestParts<AppState> for RequireBuyer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Buyer => Ok(Self(user)),
            Role::Seller | Role::Admin => {
                Err(ApiError::Forbidden("buyer role required".to_owned()))
            }
        }
    }
}

/// Extractor that requires the `admin` role.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Admin => Ok(Self(user)),
            Role::Buyer | Role::Seller => {
                Err(ApiError::Forbidden("admin role required".to_owned()))
            }
        }
    }
}

/// Whether `actor` may delete a resource owned by `owner_id`.
///
/// Owner-or-admin rule shared by review and product deletion.
#[must_use]
pub fn may_delete_owned(actor: &User, owner_id: bazaar_core::UserId) -> bool {
    actor.id == owner_id || matches!(actor.role, Role::Admin)
}

/// Establish an authenticated session for a user.
///
/// Rotates the session id before binding the identity so a pre-login cookie
/// cannot be fixed onto the authenticated session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn establish_session(session: &Session, user: &User) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_USER, CurrentUser { id: user.id })
        .await?;
    Ok(())
}

/// Terminate the session server- and client-side (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be destroyed.
pub async fn destroy_session(session: &Session) -> Result<(), ApiError> {
    session.flush().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{Email, UserId, Username};
    use chrono::Utc;

    fn user_with(id: i32, role: Role) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse("u@example.com").unwrap(),
            username: Username::parse("user1").unwrap(),
            role,
            full_name: None,
            address: None,
            card_number: None,
            support_email: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_may_delete_own_resource() {
        let buyer = user_with(1, Role::Buyer);
        assert!(may_delete_owned(&buyer, UserId::new(1)));
        assert!(!may_delete_owned(&buyer, UserId::new(2)));
    }

    #[test]
    fn admin_may_delete_anything() {
        let admin = user_with(9, Role::Admin);
        assert!(may_delete_owned(&admin, UserId::new(1)));
    }

    #[test]
    fn seller_may_not_delete_others_resources() {
        let seller = user_with(3, Role::Seller);
        assert!(!may_delete_owned(&seller, UserId::new(4)));
    }
}
