//! Authentication and account route handlers.
//!
//! The JSON surface for registration, login, confirmation codes, CSRF token
//! issue, profile management, password reset, logout, and account deletion.
//! Handlers parse and validate the wire format, then delegate flow policy to
//! [`AccountService`].

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tower_sessions::cookie::{Cookie, SameSite};

use bazaar_core::{Email, Role, Username};

use crate::error::{ApiError, Result};
use crate::middleware::{RequireUser, destroy_session, establish_session};
use crate::models::user::OwnProfile;
use crate::services::AccountService;
use crate::services::csrf::{CSRF_COOKIE, CSRF_HEADER, TOKEN_TTL_SECONDS};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub confirmation_code: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Confirmation-code request body.
#[derive(Debug, Deserialize)]
pub struct ConfirmationCodeRequest {
    pub email: Option<String>,
}

/// Password-reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub confirmation_code: Option<String>,
    pub new_password: Option<String>,
}

/// Profile-update request body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub card_number: Option<String>,
    pub support_email: Option<String>,
    pub confirmation_code: Option<String>,
    pub new_email_confirmation_code: Option<String>,
}

/// Account-deletion request body.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub confirmation_code: Option<String>,
}

/// CSRF token response body.
#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub message: String,
    pub csrf_token: String,
}

/// Username availability response body.
#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub message: String,
    pub available: bool,
}

/// Message-plus-profile response body.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: OwnProfile,
}

/// Bare message response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Input helpers
// =============================================================================

/// Require a non-empty field, mirroring the `'{field} is required'` wire
/// contract.
fn require(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
}

fn parse_email(value: &str) -> Result<Email> {
    Email::parse(value).map_err(|e| ApiError::Validation(e.to_string()))
}

fn parse_username(value: &str) -> Result<Username> {
    Username::parse(value).map_err(|e| ApiError::Validation(e.to_string()))
}

// =============================================================================
// CSRF token
// =============================================================================

/// GET /auth/csrf-token - issue an anti-forgery token.
///
/// The token travels three ways at once: as a cookie (for the double-submit
/// check), in the response body, and in an `X-CSRF-Token` response header.
/// A front end that cannot read the cross-site cookie echoes the header or
/// body value back on every mutating request.
pub async fn csrf_token(State(state): State<AppState>) -> Result<Response> {
    let token = state.csrf().issue();

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::None)
        .max_age(tower_sessions::cookie::time::Duration::seconds(
            TOKEN_TTL_SECONDS,
        ))
        .build();

    let body = CsrfTokenResponse {
        message: "CSRF token issued".to_owned(),
        csrf_token: token.clone(),
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| ApiError::Internal(format!("invalid cookie header: {e}")))?,
    );
    headers.insert(
        CSRF_HEADER,
        HeaderValue::from_str(&token)
            .map_err(|e| ApiError::Internal(format!("invalid token header: {e}")))?,
    );

    Ok(response)
}

// =============================================================================
// Guest routes
// =============================================================================

/// GET /auth/check-username/{username} - uniqueness probe.
pub async fn check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UsernameAvailability>> {
    let username = parse_username(&username)?;

    let taken = crate::db::UserRepository::new(state.pool())
        .username_taken(&username)
        .await?;

    let body = if taken {
        UsernameAvailability {
            message: "this username is already taken".to_owned(),
            available: false,
        }
    } else {
        UsernameAvailability {
            message: "this username is available".to_owned(),
            available: true,
        }
    };

    Ok(Json(body))
}

/// POST /auth/register - create an account and log it in.
///
/// Requires a confirmation code previously issued to the target email.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    let email = parse_email(&require(request.email, "email")?)?;
    let confirmation_code = require(request.confirmation_code, "confirmation_code")?;
    let username = parse_username(&require(request.username, "username")?)?;
    let password = require(request.password, "password")?;
    let full_name = require(request.full_name, "full_name")?;
    let address = require(request.address, "address")?;
    let card_number = require(request.card_number, "card_number")?;

    let service = AccountService::new(state.pool(), state.codes());
    let user = service
        .register(crate::services::account::Registration {
            email,
            username,
            password,
            full_name,
            address,
            card_number,
            confirmation_code,
        })
        .await?;

    // Auto-login on successful registration
    establish_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "account created");

    let body = AccountResponse {
        message: "account created successfully".to_owned(),
        user: OwnProfile::from(&user),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /auth/login - establish a session.
///
/// Accepts username or email; username wins when both are present. Unknown
/// account and wrong password are indistinguishable in the response.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccountResponse>> {
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("username or email and password are required".to_owned())
        })?;

    let username = request.username.filter(|u| !u.is_empty());
    let email = request.email.filter(|e| !e.is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation(
            "username or email and password are required".to_owned(),
        ));
    }

    // An identity that can't parse can't match any account; answer exactly
    // like any other bad credential
    let username = match username.map(|u| Username::parse(&u)) {
        Some(Ok(u)) => Some(u),
        Some(Err(_)) => return Err(ApiError::InvalidCredentials),
        None => None,
    };
    let email = match email.map(|e| Email::parse(&e)) {
        Some(Ok(e)) => Some(e),
        Some(Err(_)) => return Err(ApiError::InvalidCredentials),
        None => None,
    };

    let service = AccountService::new(state.pool(), state.codes());
    let user = service
        .login(username.as_ref(), email.as_ref(), &password)
        .await?;

    establish_session(&session, &user).await?;

    tracing::debug!(user_id = %user.id, "login successful");

    Ok(Json(AccountResponse {
        message: "login successful".to_owned(),
        user: OwnProfile::from(&user),
    }))
}

/// POST /auth/confirmation-code - issue a one-time code and email it.
///
/// Issues for any syntactically valid email, registered or not - the
/// response never reveals registration state.
pub async fn send_confirmation_code(
    State(state): State<AppState>,
    Json(request): Json<ConfirmationCodeRequest>,
) -> Result<Json<MessageResponse>> {
    let email = parse_email(&require(request.email, "email")?)?;

    let code = state.codes().issue(&email);

    let subject = "Confirmation code";
    let body = format!(
        "Your Bazaar confirmation code: {code}. If you didn't ask for it, somebody \
         else may be trying to use your email to register at Bazaar or to reset a \
         password for this email."
    );

    state
        .mailer()
        .send(subject, &body, &email)
        .await
        .map_err(|e| ApiError::Internal(format!("mail delivery failed: {e}")))?;

    Ok(Json(MessageResponse::new("confirmation code sent")))
}

/// POST /auth/reset-password - set a new password, unauthenticated.
///
/// The response is the same whether or not the email maps to an account.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = parse_email(&require(request.email, "email")?)?;
    let confirmation_code = require(request.confirmation_code, "confirmation_code")?;
    let new_password = require(request.new_password, "new_password")?;

    let service = AccountService::new(state.pool(), state.codes());
    service
        .reset_password(&email, &confirmation_code, &new_password)
        .await?;

    Ok(Json(MessageResponse::new("password updated")))
}

// =============================================================================
// Session routes
// =============================================================================

/// GET /auth/me - read own profile.
pub async fn me(RequireUser(user): RequireUser) -> Json<AccountResponse> {
    Json(AccountResponse {
        message: "ok".to_owned(),
        user: OwnProfile::from(&user),
    })
}

/// PUT /auth/me - update own profile.
///
/// Requires a confirmation code for the current email; changing the email
/// requires a second code for the new address in the same request. The role
/// can only move between buyer and seller.
pub async fn update_me(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<UpdateMeRequest>,
) -> Result<Json<AccountResponse>> {
    let confirmation_code = require(request.confirmation_code, "confirmation_code")?;

    let email = request
        .email
        .filter(|e| !e.is_empty())
        .map(|e| parse_email(&e))
        .transpose()?;
    let username = request
        .username
        .filter(|u| !u.is_empty())
        .map(|u| parse_username(&u))
        .transpose()?;
    let role = request
        .role
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.parse::<Role>()
                .map_err(|_| ApiError::Validation("invalid role".to_owned()))
        })
        .transpose()?;

    let update = crate::services::account::ProfileUpdate {
        email,
        username,
        password: request.password.filter(|p| !p.is_empty()),
        role,
        full_name: request.full_name.filter(|v| !v.is_empty()),
        address: request.address.filter(|v| !v.is_empty()),
        card_number: request.card_number.filter(|v| !v.is_empty()),
        support_email: request.support_email.filter(|v| !v.is_empty()),
        confirmation_code,
        new_email_confirmation_code: request
            .new_email_confirmation_code
            .filter(|v| !v.is_empty()),
    };

    let service = AccountService::new(state.pool(), state.codes());
    let updated = service.update_profile(&user, update).await?;

    tracing::info!(user_id = %updated.id, "profile updated");

    Ok(Json(AccountResponse {
        message: "profile updated successfully".to_owned(),
        user: OwnProfile::from(&updated),
    }))
}

/// POST /auth/logout - end the session.
pub async fn logout(
    RequireUser(user): RequireUser,
    session: Session,
) -> Result<Json<MessageResponse>> {
    destroy_session(&session).await?;
    tracing::debug!(user_id = %user.id, "logout");
    Ok(Json(MessageResponse::new("logout successful")))
}

/// POST /auth/delete-account - delete the account and ban its email.
pub async fn delete_account(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>> {
    let confirmation_code = require(request.confirmation_code, "confirmation_code")?;

    let service = AccountService::new(state.pool(), state.codes());
    service.delete_account(&user, &confirmation_code).await?;

    destroy_session(&session).await?;

    tracing::info!(user_id = %user.id, "account deleted and email banned");

    Ok(Json(MessageResponse::new("account deleted successfully")))
}
