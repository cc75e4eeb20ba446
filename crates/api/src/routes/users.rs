//! Public user profile route.

use axum::{
    Json,
    extract::{Path, State},
};

use bazaar_core::UserId;

use crate::db::UserRepository;
use crate::error::{ApiError, Result};
use crate::middleware::RequireUser;
use crate::models::user::PublicProfile;
use crate::state::AppState;

/// GET /api/users/{id} - public information about a single user.
///
/// Requires a session; exposes only username, full name, role, and the
/// support contact.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Path(user_id): Path<i32>,
) -> Result<Json<PublicProfile>> {
    let user = UserRepository::new(state.pool())
        .find_by_id(UserId::new(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user".to_owned()))?;

    Ok(Json(PublicProfile::from(&user)))
}
