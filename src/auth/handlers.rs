//! Authentication handlers for the OAuth2/OIDC flows
//!
//! - `login_handler`: starts the authorization code flow (state + PKCE)
//! - `callback_handler`: validates state and exchanges the code for tokens
//! - `refresh_handler`: renews the session with the refresh token
//! - `logout_handler`: clears portal cookies and ends the Keycloak session
//! - `logout_complete_handler`: landing spot after Keycloak logout

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use oauth2::{
    basic::{BasicErrorResponseType, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardErrorResponse, StandardRevocableToken, StandardTokenIntrospectionResponse,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::helpers::{
    build_keycloak_logout_url, create_http_client, extract_cookie, safe_redirect_target,
    ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, OAUTH_STATE_COOKIE, PKCE_VERIFIER_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use crate::{config::Config, AppState};

/// Login round-trip cookies live this long (seconds)
const LOGIN_FLOW_MAX_AGE: u64 = 600;
/// Used when Keycloak omits `expires_in`
const DEFAULT_ACCESS_MAX_AGE: u64 = 300;
/// Used when Keycloak omits `refresh_expires_in`
const DEFAULT_REFRESH_MAX_AGE: u64 = 1800;

// =============================================================================
// Types
// =============================================================================

/// Keycloak-specific fields in the token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcTokenFields {
    pub id_token: Option<String>,
    pub refresh_expires_in: Option<u64>,
}

impl ExtraTokenFields for OidcTokenFields {}

type OidcTokenResponse = StandardTokenResponse<OidcTokenFields, BasicTokenType>;

/// OAuth client with auth and token endpoints configured
type ConfiguredOAuthClient = oauth2::Client<
    StandardErrorResponse<BasicErrorResponseType>,
    OidcTokenResponse,
    StandardTokenIntrospectionResponse<OidcTokenFields, BasicTokenType>,
    StandardRevocableToken,
    StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub rd: Option<String>,
}

// =============================================================================
// Internal Helpers
// =============================================================================

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Append `Set-Cookie` headers, failing rather than panicking on bad values
fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    value_len = cookie.len(),
                    "Failed to create Set-Cookie header - possible malformed token"
                );
                return json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error setting response headers",
                );
            }
        }
    }
    response
}

fn create_oauth_client(config: &Config) -> Result<ConfiguredOAuthClient, String> {
    // Browser-facing authorize endpoint, server-to-server token endpoint
    let auth_url = AuthUrl::new(format!(
        "{}/realms/{}/protocol/openid-connect/auth",
        config.keycloak_callback_url, config.keycloak_realm
    ))
    .map_err(|e| format!("Invalid auth URL: {}", e))?;

    let token_url = TokenUrl::new(format!(
        "{}/realms/{}/protocol/openid-connect/token",
        config.keycloak_url, config.keycloak_realm
    ))
    .map_err(|e| format!("Invalid token URL: {}", e))?;

    let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
        .map_err(|e| format!("Invalid redirect URL: {}", e))?;

    Ok(oauth2::Client::new(ClientId::new(config.client_id.clone()))
        .set_client_secret(ClientSecret::new(config.client_secret.clone()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url))
}

/// Cookies that establish a session from a token response
fn session_cookies(config: &Config, tokens: &OidcTokenResponse) -> Vec<String> {
    let access_max_age = tokens
        .expires_in()
        .map(|d| d.as_secs())
        .unwrap_or(DEFAULT_ACCESS_MAX_AGE);

    let mut cookies = vec![config.cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token().secret(),
        "/",
        access_max_age,
    )];

    let refresh_max_age = tokens
        .extra_fields()
        .refresh_expires_in
        .unwrap_or(DEFAULT_REFRESH_MAX_AGE);

    if let Some(refresh_token) = tokens.refresh_token() {
        cookies.push(config.cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token.secret(),
            "/",
            refresh_max_age,
        ));
    }

    // Kept as long as the session can be refreshed, so logout can send the hint
    match tokens.extra_fields().id_token.as_deref() {
        Some(id_token) => cookies.push(config.cookie(
            ID_TOKEN_COOKIE,
            id_token,
            "/",
            access_max_age.max(refresh_max_age),
        )),
        None => tracing::warn!("No id_token received from Keycloak - logout will use client_id"),
    }

    cookies
}

/// Cookies that remove every portal session cookie
fn clear_session_cookies(config: &Config) -> Vec<String> {
    vec![
        config.cookie(ACCESS_TOKEN_COOKIE, "", "/", 0),
        config.cookie(ID_TOKEN_COOKIE, "", "/", 0),
        config.cookie(REFRESH_TOKEN_COOKIE, "", "/", 0),
        config.cookie(OAUTH_STATE_COOKIE, "", "/auth", 0),
        config.cookie(PKCE_VERIFIER_COOKIE, "", "/auth", 0),
    ]
}

/// Report a missing realm roles mapper once per login
async fn warn_if_roles_missing(state: &AppState, access_token: &str) {
    match state.jwt_validator.validate(access_token).await {
        Ok(claims) if !claims.has_realm_access() => tracing::warn!(
            user = %claims.sub,
            "Token has no realm_access claim - user will only see public portals. \
             Check the Keycloak client scope for the realm roles mapper."
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Freshly issued access token failed validation"),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Login handler - redirects to Keycloak with CSRF state and a PKCE challenge
pub async fn login_handler(State(state): State<Arc<AppState>>) -> Response {
    let oauth_client = match create_oauth_client(&state.config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create OAuth client");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "OAuth configuration error");
        }
    };

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = oauth_client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    tracing::info!(
        keycloak_public_url = %state.config.keycloak_callback_url,
        realm = %state.config.keycloak_realm,
        "Redirecting to Keycloak for authentication"
    );

    with_cookies(
        Redirect::to(auth_url.as_str()).into_response(),
        &[
            state.config.cookie(
                OAUTH_STATE_COOKIE,
                csrf_token.secret(),
                "/auth",
                LOGIN_FLOW_MAX_AGE,
            ),
            state.config.cookie(
                PKCE_VERIFIER_COOKIE,
                pkce_verifier.secret(),
                "/auth",
                LOGIN_FLOW_MAX_AGE,
            ),
        ],
    )
}

/// Callback handler - validates state and exchanges the code for tokens
pub async fn callback_handler(
    Query(params): Query<CallbackParams>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = ?params.error_description,
            "OAuth authorization failed"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": error,
                "error_description": params.error_description
            })),
        )
            .into_response();
    }

    let Some(state_from_callback) = params.state else {
        tracing::warn!("CSRF validation failed: no state parameter in callback");
        return json_error(StatusCode::BAD_REQUEST, "Missing state parameter");
    };

    let Some(stored_state) = extract_cookie(&headers, OAUTH_STATE_COOKIE) else {
        tracing::warn!("CSRF validation failed: no oauth_state cookie");
        return json_error(
            StatusCode::UNAUTHORIZED,
            "CSRF validation failed: missing state cookie",
        );
    };

    if state_from_callback != stored_state {
        tracing::warn!("CSRF validation failed: state mismatch");
        return json_error(StatusCode::UNAUTHORIZED, "CSRF validation failed: state mismatch");
    }

    let Some(verifier) = extract_cookie(&headers, PKCE_VERIFIER_COOKIE) else {
        tracing::warn!("No pkce_verifier cookie for callback");
        return json_error(StatusCode::UNAUTHORIZED, "Missing PKCE verifier");
    };

    let Some(code) = params.code else {
        tracing::warn!("No authorization code received");
        return json_error(StatusCode::BAD_REQUEST, "Missing authorization code");
    };

    let oauth_client = match create_oauth_client(&state.config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create OAuth client");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "OAuth configuration error");
        }
    };

    let http_client = match create_http_client(
        state.config.http_connect_timeout_secs,
        state.config.http_request_timeout_secs,
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client for token exchange");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let tokens = match oauth_client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(PkceCodeVerifier::new(verifier))
        .request_async(&http_client)
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange code for tokens");
            return json_error(StatusCode::UNAUTHORIZED, "Token exchange failed");
        }
    };

    warn_if_roles_missing(&state, tokens.access_token().secret()).await;

    let mut cookies = session_cookies(&state.config, &tokens);
    cookies.push(state.config.cookie(OAUTH_STATE_COOKIE, "", "/auth", 0));
    cookies.push(state.config.cookie(PKCE_VERIFIER_COOKIE, "", "/auth", 0));

    tracing::info!(
        has_refresh_token = tokens.refresh_token().is_some(),
        "Authentication successful, redirecting to dashboard"
    );
    with_cookies(Redirect::to("/").into_response(), &cookies)
}

/// Refresh handler - renews the session and returns to a local path
///
/// Any failure ends the session and restarts login.
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RefreshQuery>,
    headers: HeaderMap,
) -> Response {
    let target = safe_redirect_target(query.rd.as_deref());
    let restart_login = |reason: &str| {
        tracing::info!(reason, "Session refresh failed, restarting login");
        with_cookies(
            Redirect::to("/auth/login").into_response(),
            &clear_session_cookies(&state.config),
        )
    };

    let Some(refresh_token) = extract_cookie(&headers, REFRESH_TOKEN_COOKIE) else {
        return restart_login("missing refresh_token cookie");
    };

    let oauth_client = match create_oauth_client(&state.config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create OAuth client");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "OAuth configuration error");
        }
    };

    let http_client = match create_http_client(
        state.config.http_connect_timeout_secs,
        state.config.http_request_timeout_secs,
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client for token refresh");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match oauth_client
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .request_async(&http_client)
        .await
    {
        Ok(tokens) => {
            tracing::debug!(redirect_to = %target, "Session refreshed");
            with_cookies(
                Redirect::to(&target).into_response(),
                &session_cookies(&state.config, &tokens),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Refresh token exchange failed");
            restart_login("refresh token rejected")
        }
    }
}

/// Logout handler - clears portal cookies, then ends the Keycloak session
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let id_token = extract_cookie(&headers, ID_TOKEN_COOKIE);

    let keycloak_logout_url = build_keycloak_logout_url(
        &state.config.keycloak_callback_url,
        &state.config.keycloak_realm,
        &state.config.portal_public_url,
        &state.config.client_id,
        id_token.as_deref(),
    );

    // The URL may carry id_token_hint, so it is not logged
    tracing::info!(
        event = "keycloak_logout_redirect",
        has_id_token = id_token.is_some(),
        keycloak_realm = %state.config.keycloak_realm,
        "Redirecting to Keycloak end-session"
    );

    with_cookies(
        Redirect::to(&keycloak_logout_url).into_response(),
        &clear_session_cookies(&state.config),
    )
}

/// Logout complete handler - landing page after Keycloak logout
pub async fn logout_complete_handler() -> Response {
    tracing::info!(event = "logout_complete", "Logout complete");
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{base_vars, config_from};

    #[test]
    fn test_create_oauth_client_from_config() {
        let config = config_from(&base_vars()).unwrap();
        assert!(create_oauth_client(&config).is_ok());
    }

    #[test]
    fn test_create_oauth_client_rejects_bad_redirect() {
        let mut vars = base_vars();
        vars.insert("REDIRECT_URI", "not a url".to_string());
        let config = config_from(&vars).unwrap();
        assert!(create_oauth_client(&config).is_err());
    }

    #[test]
    fn test_clear_session_cookies_expire_everything() {
        let config = config_from(&base_vars()).unwrap();
        let cookies = clear_session_cookies(&config);
        assert_eq!(cookies.len(), 5);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("oauth_state=;") && c.contains("Path=/auth")));
    }

    #[test]
    fn test_session_cookies_from_token_response() {
        let config = config_from(&base_vars()).unwrap();
        let tokens: OidcTokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "acc",
            "token_type": "bearer",
            "expires_in": 300,
            "refresh_token": "ref",
            "refresh_expires_in": 1800,
            "id_token": "idt"
        }))
        .unwrap();

        let cookies = session_cookies(&config, &tokens);
        assert_eq!(cookies.len(), 3);
        assert!(cookies[0].starts_with("access_token=acc;"));
        assert!(cookies[0].contains("Max-Age=300"));
        assert!(cookies[1].starts_with("refresh_token=ref;"));
        assert!(cookies[1].contains("Max-Age=1800"));
        assert!(cookies[2].starts_with("id_token=idt;"));
    }

    #[test]
    fn test_with_cookies_rejects_invalid_header() {
        let response = with_cookies(
            Redirect::to("/").into_response(),
            &["bad\nvalue".to_string()],
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_with_cookies_appends_all() {
        let response = with_cookies(
            Redirect::to("/").into_response(),
            &["a=1".to_string(), "b=2".to_string()],
        );
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
    }
}
