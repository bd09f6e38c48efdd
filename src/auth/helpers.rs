//! Pure helper functions for authentication
//!
//! Cookie extraction, redirect target sanitizing, Keycloak URL builders and
//! the HTTP client used for token requests.

use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::time::Duration;

use super::session::unix_now;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const ID_TOKEN_COOKIE: &str = "id_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const PKCE_VERIFIER_COOKIE: &str = "pkce_verifier";

/// Seconds of clock skew tolerated when checking token expiry
const CLOCK_SKEW_SECS: i64 = 5;

// =============================================================================
// JWT Helpers
// =============================================================================

/// Read the `exp` claim of a JWT without verifying its signature
///
/// Only used to decide whether a token is still worth sending to Keycloak.
pub fn unverified_exp(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    json.get("exp").and_then(|v| v.as_i64())
}

/// True if the token is expired or unreadable
pub fn is_jwt_expired(token: &str) -> bool {
    match unverified_exp(token) {
        Some(exp) => exp < (unix_now() as i64 - CLOCK_SKEW_SECS),
        None => true,
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// Client for OAuth2 token requests; redirects are never followed
pub fn create_http_client(
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
}

// =============================================================================
// URL Builders
// =============================================================================

/// Build the Keycloak end-session URL
///
/// Keycloak requires either `id_token_hint` or `client_id` alongside
/// `post_logout_redirect_uri`. A non-expired id_token is preferred.
pub fn build_keycloak_logout_url(
    keycloak_callback_url: &str,
    keycloak_realm: &str,
    portal_public_url: &str,
    client_id: &str,
    id_token: Option<&str>,
) -> String {
    let logout_complete_url = format!("{}/auth/logout/complete", portal_public_url);
    let post_logout_redirect = urlencoding::encode(&logout_complete_url);
    let base = format!(
        "{}/realms/{}/protocol/openid-connect/logout",
        keycloak_callback_url, keycloak_realm
    );

    match id_token.filter(|t| !t.trim().is_empty() && !is_jwt_expired(t)) {
        Some(id_token) => format!(
            "{}?id_token_hint={}&post_logout_redirect_uri={}",
            base,
            urlencoding::encode(id_token),
            post_logout_redirect
        ),
        None => {
            tracing::info!(
                has_id_token = id_token.is_some(),
                "No usable id_token, using client_id for Keycloak logout"
            );
            format!(
                "{}?client_id={}&post_logout_redirect_uri={}",
                base,
                urlencoding::encode(client_id),
                post_logout_redirect
            )
        }
    }
}

/// URL that sends the browser through a token refresh and back to `path`
pub fn build_refresh_url(path: &str) -> String {
    format!("/auth/refresh?rd={}", urlencoding::encode(path))
}

/// Placeholder origin for resolving redirect targets the way a browser would
const REDIRECT_BASE: &str = "http://portal.invalid/";

/// Accept only local absolute paths as post-refresh redirect targets
///
/// Anything else (absolute URLs, protocol-relative `//host`, backslash or
/// control character tricks) falls back to `/`.
pub fn safe_redirect_target(rd: Option<&str>) -> String {
    rd.filter(|path| is_local_path(path))
        .map(str::to_string)
        .unwrap_or_else(|| "/".to_string())
}

fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/')
        || path.starts_with("/auth/")
        || path.chars().any(|c| c == '\\' || c.is_ascii_control())
    {
        return false;
    }

    // The resolved target must stay on the portal's own origin
    let Ok(base) = url::Url::parse(REDIRECT_BASE) else {
        return false;
    };
    base.join(path)
        .map(|resolved| resolved.origin() == base.origin())
        .unwrap_or(false)
}

// =============================================================================
// Cookie Extraction
// =============================================================================

/// Extract a cookie value from headers
///
/// Proxies may fold or duplicate Cookie headers, so every one is searched.
/// The first occurrence wins.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);

    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|c| c.strip_prefix(prefix.as_str()))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    // {"alg":"none","typ":"JWT"}
    const HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    // {"exp":4102444800}
    const FUTURE_PAYLOAD: &str = "eyJleHAiOjQxMDI0NDQ4MDB9";
    // {"exp":1577836800}
    const PAST_PAYLOAD: &str = "eyJleHAiOjE1Nzc4MzY4MDB9";

    #[test]
    fn test_unverified_exp() {
        let token = format!("{}.{}.", HEADER, FUTURE_PAYLOAD);
        assert_eq!(unverified_exp(&token), Some(4102444800));
    }

    #[test]
    fn test_is_jwt_expired() {
        assert!(!is_jwt_expired(&format!("{}.{}.", HEADER, FUTURE_PAYLOAD)));
        assert!(is_jwt_expired(&format!("{}.{}.", HEADER, PAST_PAYLOAD)));
    }

    #[test]
    fn test_is_jwt_expired_malformed() {
        assert!(is_jwt_expired("not-a-jwt"));
        assert!(is_jwt_expired("only.two"));
        assert!(is_jwt_expired("a.b.c.d"));
        assert!(is_jwt_expired(""));
    }

    #[test]
    fn test_keycloak_logout_url_with_id_token() {
        let id_token = format!("{}.{}.", HEADER, FUTURE_PAYLOAD);
        let url = build_keycloak_logout_url(
            "https://login.example.com",
            "CandidStudios",
            "https://portal.example.com",
            "dashboard",
            Some(&id_token),
        );
        assert!(url.starts_with(
            "https://login.example.com/realms/CandidStudios/protocol/openid-connect/logout?id_token_hint="
        ));
        assert!(url.ends_with(
            "post_logout_redirect_uri=https%3A%2F%2Fportal.example.com%2Fauth%2Flogout%2Fcomplete"
        ));
    }

    #[test]
    fn test_keycloak_logout_url_expired_token_uses_client_id() {
        let id_token = format!("{}.{}.", HEADER, PAST_PAYLOAD);
        let url = build_keycloak_logout_url(
            "https://login.example.com",
            "CandidStudios",
            "https://portal.example.com",
            "dashboard",
            Some(&id_token),
        );
        assert!(url.contains("?client_id=dashboard&"));
        assert!(!url.contains("id_token_hint"));
    }

    #[test]
    fn test_keycloak_logout_url_without_token() {
        let url = build_keycloak_logout_url(
            "https://login.example.com",
            "r",
            "https://portal.example.com",
            "dashboard",
            None,
        );
        assert!(url.contains("client_id=dashboard"));
    }

    #[test]
    fn test_build_refresh_url_encodes_path() {
        assert_eq!(build_refresh_url("/admin"), "/auth/refresh?rd=%2Fadmin");
    }

    #[test]
    fn test_safe_redirect_target() {
        assert_eq!(safe_redirect_target(Some("/admin")), "/admin");
        assert_eq!(safe_redirect_target(Some("/api/portals")), "/api/portals");
        assert_eq!(safe_redirect_target(Some("//evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("https://evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/auth/refresh")), "/");
        assert_eq!(safe_redirect_target(None), "/");
    }

    #[test]
    fn test_safe_redirect_target_keeps_query() {
        assert_eq!(
            safe_redirect_target(Some("/admin?tab=roles")),
            "/admin?tab=roles"
        );
    }

    #[test]
    fn test_safe_redirect_target_rejects_control_characters() {
        // Browsers strip these while parsing, turning `/\t/host` into `//host`
        assert_eq!(safe_redirect_target(Some("/\t/evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/\n/evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/\r/evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/\r\n/evil.example.com")), "/");
        assert_eq!(safe_redirect_target(Some("/admin\u{0}")), "/");
    }

    #[test]
    fn test_extract_cookie_finds_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("foo=bar; id_token=abc123; baz=qux"),
        );
        assert_eq!(extract_cookie(&headers, "id_token"), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_cookie_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("foo=bar; baz=qux"));
        assert_eq!(extract_cookie(&headers, "id_token"), None);
        assert_eq!(extract_cookie(&HeaderMap::new(), "id_token"), None);
    }

    #[test]
    fn test_extract_cookie_does_not_match_suffix() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("xaccess_token=nope"));
        assert_eq!(extract_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_extract_cookie_empty_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("access_token="));
        assert_eq!(extract_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_extract_cookie_multiple_headers_first_match() {
        let mut headers = HeaderMap::new();
        headers.append("cookie", HeaderValue::from_static("foo=bar"));
        headers.append("cookie", HeaderValue::from_static("id_token=first"));
        headers.append("cookie", HeaderValue::from_static("id_token=second"));
        assert_eq!(extract_cookie(&headers, "id_token"), Some("first".to_string()));
    }
}
