use super::templates::{AccessDeniedTemplate, AdminTemplate, DashboardTemplate};
use super::view::{build_sections, HeaderView, SectionView, AVAILABLE_ROLES};
use crate::{
    access::{accessible_resources, group_by_category},
    auth::{extractors::AuthenticatedUser, unix_now, Session, UserProfile},
    AppState,
};
use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Liveness probe - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe - ready once the JWKS has been fetched from Keycloak
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.jwt_validator.is_jwks_cached().await {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("Readiness check failed: JWKS not cached");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready: JWKS not cached")
    }
}

fn render(template: &impl Template, status: StatusCode) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Resolve and lay out the portals a session may see
fn resolve_sections(state: &AppState, session: &Session) -> Vec<SectionView> {
    let roles = session.current_role_set(unix_now());
    let visible = accessible_resources(&roles, &state.catalog.portals);

    tracing::debug!(
        user = %session.profile.id,
        roles = ?roles,
        total_portals = state.catalog.len(),
        accessible_portals = visible.len(),
        "Resolved portals for user"
    );

    build_sections(&group_by_category(visible), &state.config.admin_console_url)
}

pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser { session }: AuthenticatedUser,
) -> Response {
    let sections = resolve_sections(&state, &session);
    if sections.is_empty() {
        tracing::info!(user = %session.profile.id, "User has access to no portals");
    }

    let template = DashboardTemplate {
        header: HeaderView::from_session(&session),
        sections,
    };
    render(&template, StatusCode::OK)
}

pub async fn admin_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser { session }: AuthenticatedUser,
) -> Response {
    let header = HeaderView::from_session(&session);

    if !session.is_admin(unix_now()) {
        tracing::warn!(
            user = %session.profile.id,
            roles = %session.display_roles(),
            "Admin page denied"
        );
        return render(&AccessDeniedTemplate { header }, StatusCode::FORBIDDEN);
    }

    let template = AdminTemplate {
        header,
        roles: &AVAILABLE_ROLES,
        console_url: state.config.admin_console_url.clone(),
    };
    render(&template, StatusCode::OK)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalsResponse {
    pub user: UserProfile,
    pub roles: Vec<String>,
    pub sections: Vec<SectionView>,
    pub total: usize,
}

/// JSON rendering of the same resolution the dashboard shows
pub async fn portals_api_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser { session }: AuthenticatedUser,
) -> Json<PortalsResponse> {
    let sections = resolve_sections(&state, &session);
    let total = sections.iter().map(|s| s.portals.len()).sum();

    Json(PortalsResponse {
        roles: session
            .current_role_set(unix_now())
            .iter()
            .map(str::to_string)
            .collect(),
        user: session.profile,
        sections,
        total,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::{base_vars, config_from};
    use crate::{auth::jwt::JwtValidator, catalog::Catalog};

    pub(crate) fn state() -> AppState {
        let config = config_from(&base_vars()).unwrap();
        AppState {
            catalog: Arc::new(Catalog::builtin().unwrap()),
            jwt_validator: Arc::new(JwtValidator::new(&config).unwrap()),
            config: Arc::new(config),
        }
    }

    fn session(roles: &[&str]) -> Session {
        Session::new(
            UserProfile {
                id: "u1".to_string(),
                email: Some("jo@candidstudios.net".to_string()),
                first_name: None,
                last_name: None,
                full_name: Some("Jo Doe".to_string()),
                username: Some("jdoe".to_string()),
            },
            roles.iter().copied().collect(),
            unix_now() + 3600,
        )
    }

    #[test]
    fn test_resolve_sections_for_editor() {
        let sections = resolve_sections(&state(), &session(&["editor"]));
        let ids: Vec<&str> = sections
            .iter()
            .flat_map(|s| s.portals.iter().map(|p| p.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["referral", "media", "editor", "client"]);
    }

    #[test]
    fn test_expired_session_sees_only_public() {
        let expired = Session::new(session(&[]).profile, ["admin"].into_iter().collect(), 1);
        let sections = resolve_sections(&state(), &expired);
        let keys: Vec<&str> = sections.iter().map(|s| s.category).collect();
        assert_eq!(keys, vec!["operations", "client"]);
    }

    #[test]
    fn test_dashboard_template_renders_sections() {
        let s = session(&["analyst"]);
        let template = DashboardTemplate {
            header: HeaderView::from_session(&s),
            sections: resolve_sections(&state(), &s),
        };
        let html = template.render().unwrap();
        assert!(html.contains("Analytics &amp; Reporting"));
        assert!(html.contains("Jo Doe"));
        assert!(!html.contains("You don't have access"));
    }

    #[test]
    fn test_dashboard_template_renders_empty_state() {
        let s = session(&[]);
        let template = DashboardTemplate {
            header: HeaderView::from_session(&s),
            sections: Vec::new(),
        };
        let html = template.render().unwrap();
        assert!(html.contains("contact your administrator"));
    }

    #[test]
    fn test_admin_template_lists_roles() {
        let s = session(&["admin"]);
        let template = AdminTemplate {
            header: HeaderView::from_session(&s),
            roles: &AVAILABLE_ROLES,
            console_url: "https://login.example.com/admin/master/console/#/r".to_string(),
        };
        let html = template.render().unwrap();
        assert!(html.contains("vendor-coordinator"));
        assert!(html.contains("login.example.com"));
    }

    #[test]
    fn test_render_access_denied_status() {
        let s = session(&["editor"]);
        let response = render(
            &AccessDeniedTemplate {
                header: HeaderView::from_session(&s),
            },
            StatusCode::FORBIDDEN,
        );
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
