//! CSRF verification middleware.
//!
//! Applied to the whole router: every state-changing request must carry a
//! valid `csrf_token` cookie and a matching `X-CSRF-Token` header before any
//! domain logic runs. Safe methods pass through untouched.

use axum::{
    extract::{Request, State},
    http::{Method, header::COOKIE},
    middleware::Next,
    response::Response,
};
use tower_sessions::cookie::Cookie;

use crate::error::ApiError;
use crate::services::csrf::{CSRF_COOKIE, CSRF_HEADER};
use crate::state::AppState;

/// Verify the double-submit CSRF pair on mutating requests.
///
/// # Errors
///
/// Returns `ApiError::Csrf` (401) when the pair is missing, mismatched,
/// malformed, forged, or expired.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let cookie_token = csrf_cookie_value(&request);
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    state.csrf().verify(cookie_token.as_deref(), header_token)?;

    Ok(next.run(request).await)
}

/// Methods that never mutate state and skip the check.
fn is_safe_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS
}

/// Pull the CSRF token out of the request's cookie headers.
fn csrf_cookie_value(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .find(|cookie| cookie.name() == CSRF_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_methods_are_exempt() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PUT));
        assert!(!is_safe_method(&Method::DELETE));
        assert!(!is_safe_method(&Method::PATCH));
    }

    #[test]
    fn cookie_value_is_found_among_others() {
        let request = Request::builder()
            .header(COOKIE, "a=1; csrf_token=tok-123; b=2")
            .body(axum::body::Body::empty())
            .expect("request builds");
        assert_eq!(csrf_cookie_value(&request), Some("tok-123".to_owned()));
    }

    #[test]
    fn absent_cookie_yields_none() {
        let request = Request::builder()
            .header(COOKIE, "a=1; b=2")
            .body(axum::body::Body::empty())
            .expect("request builds");
        assert_eq!(csrf_cookie_value(&request), None);
    }
}
