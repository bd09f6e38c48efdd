use super::handlers::{
    admin_handler, dashboard_handler, healthz_handler, portals_api_handler, readyz_handler,
};
use crate::{
    auth::{
        callback_handler, login_handler, logout_complete_handler, logout_handler, refresh_handler,
    },
    AppState,
};
use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/admin", get(admin_handler))
        .route("/api/portals", get(portals_api_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/auth/refresh", get(refresh_handler))
        .route("/auth/logout", get(logout_handler).post(logout_handler))
        .route("/auth/logout/complete", get(logout_complete_handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("origin-when-cross-origin"),
        ))
        .with_state(state)
}
