//! Admin routes for user management.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use bazaar_core::{Email, Role, UserId, Username};

use crate::db::UserRepository;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::user::User;
use crate::routes::auth::MessageResponse;
use crate::state::AppState;

/// Summary row for the admin user listing.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    pub role: Role,
    pub full_name: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
        }
    }
}

/// Full profile view for admins.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    pub role: Role,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub support_email: Option<String>,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
            address: user.address.clone(),
            card_number: user.card_number.clone(),
            support_email: user.support_email.clone(),
        }
    }
}

/// GET /api/admin/users - list all users.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserSummary>>> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

/// GET /api/admin/users/{id} - full profile of one user.
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<i32>,
) -> Result<Json<UserDetail>> {
    let user = UserRepository::new(state.pool())
        .find_by_id(UserId::new(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user".to_owned()))?;

    Ok(Json(UserDetail::from(&user)))
}

/// DELETE /api/admin/users/{id} - delete a user and ban their email.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let user_id = UserId::new(user_id);

    UserRepository::new(state.pool())
        .delete_and_ban(user_id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => ApiError::NotFound("user".to_owned()),
            other => other.into(),
        })?;

    tracing::info!(target_user = %user_id, admin = %admin.id, "user deleted, email banned");

    Ok(Json(MessageResponse::new("user deleted, email banned")))
}
