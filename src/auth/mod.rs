//! Authentication module
//!
//! Turns a Keycloak login into a per-request [`Session`].
//!
//! ## Structure
//!
//! - `jwt`: access token validation against a cached JWKS
//! - `session`: the Session value object and its lifecycle
//! - `extractors`: Axum extractor producing a Session
//! - `helpers`: pure helpers (cookie extraction, redirect targets, URL builders)
//! - `handlers`: login, callback, refresh and logout flows
//!
//! ## Authentication Flow
//!
//! 1. Browser route without a session → `/auth/login` → Keycloak
//! 2. Keycloak authenticates → `/auth/callback` → cookies set → `/`
//! 3. Session close to expiry → `/auth/refresh?rd=<path>` → back to `<path>`
//! 4. `/auth/logout` → cookies cleared → Keycloak end-session → `/auth/logout/complete`

pub mod extractors;
pub mod handlers;
pub mod helpers;
pub mod jwt;
pub mod session;

pub use handlers::{
    callback_handler, login_handler, logout_complete_handler, logout_handler, refresh_handler,
    CallbackParams, RefreshQuery,
};
pub use session::{unix_now, Session, SessionStatus, UserProfile, ADMIN_ROLE};
