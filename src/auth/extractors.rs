use crate::auth::helpers::{
    build_refresh_url, extract_cookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::auth::session::{unix_now, Session, SessionStatus};
use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Why a request could not be given a session
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Browser route without a usable session: start the login flow
    LoginRequired,
    /// Browser route whose session can be renewed: refresh, then return to the path
    RefreshRequired(String),
    /// API route without a usable session
    Unauthenticated(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::LoginRequired => Redirect::to("/auth/login").into_response(),
            AuthError::RefreshRequired(path) => {
                Redirect::to(&build_refresh_url(&path)).into_response()
            }
            AuthError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Authentication required",
                    "message": msg,
                    "code": "UNAUTHENTICATED"
                })),
            )
                .into_response(),
        }
    }
}

/// Pick the rejection for a request that has no usable session
fn reject(path_and_query: &str, has_refresh_token: bool, reason: &str) -> AuthError {
    if path_and_query.starts_with("/api/") {
        AuthError::Unauthenticated(reason.to_string())
    } else if has_refresh_token {
        AuthError::RefreshRequired(path_and_query.to_string())
    } else {
        AuthError::LoginRequired
    }
}

/// Authenticated user extractor - validates the access token cookie
///
/// ```rust,ignore
/// async fn handler(AuthenticatedUser { session }: AuthenticatedUser) {
///     let roles = session.current_role_set(unix_now());
/// }
/// ```
pub struct AuthenticatedUser {
    pub session: Session,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let has_refresh_token = extract_cookie(&parts.headers, REFRESH_TOKEN_COOKIE).is_some();

        let Some(token) = extract_cookie(&parts.headers, ACCESS_TOKEN_COOKIE) else {
            tracing::debug!(path = %path_and_query, has_refresh_token, "No access_token cookie");
            return Err(reject(&path_and_query, has_refresh_token, "Missing access_token cookie"));
        };

        let claims = match state.jwt_validator.validate(&token).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::info!(error = %e, path = %path_and_query, "Rejected access token");
                return Err(reject(&path_and_query, has_refresh_token, "Invalid token"));
            }
        };

        let session = Session::from_claims(&claims);

        match session.status(unix_now(), state.config.token_min_validity_secs) {
            SessionStatus::Valid => {}
            SessionStatus::RefreshDue if has_refresh_token => {
                // Browser routes renew early; APIs keep using the token until it lapses
                if !path_and_query.starts_with("/api/") {
                    tracing::debug!(user = %claims.sub, "Session close to expiry, refreshing");
                    return Err(AuthError::RefreshRequired(path_and_query));
                }
            }
            SessionStatus::RefreshDue => {}
            SessionStatus::Expired => {
                return Err(reject(&path_and_query, has_refresh_token, "Session expired"));
            }
        }

        // Warned once per login by the callback; per-request noise stays at debug
        if !claims.has_realm_access() {
            tracing::debug!(user = %claims.sub, "Token has no realm_access claim");
        }

        Ok(AuthenticatedUser { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn test_reject_browser_without_refresh_goes_to_login() {
        assert_eq!(reject("/", false, "x"), AuthError::LoginRequired);
        assert_eq!(reject("/admin", false, "x"), AuthError::LoginRequired);
    }

    #[test]
    fn test_reject_browser_with_refresh_token_refreshes() {
        assert_eq!(
            reject("/admin", true, "x"),
            AuthError::RefreshRequired("/admin".to_string())
        );
    }

    #[test]
    fn test_reject_api_is_unauthorized() {
        assert_eq!(
            reject("/api/portals", true, "Invalid token"),
            AuthError::Unauthenticated("Invalid token".to_string())
        );
    }

    #[test]
    fn test_login_required_redirects() {
        let response = AuthError::LoginRequired.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/auth/login");
    }

    #[test]
    fn test_refresh_required_redirect_carries_path() {
        let response = AuthError::RefreshRequired("/admin".to_string()).into_response();
        assert_eq!(response.headers()[LOCATION], "/auth/refresh?rd=%2Fadmin");
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let response = AuthError::Unauthenticated("Missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
