//! Role-gated portal dashboard
//!
//! Loads a static catalog of internal portals, authenticates users against
//! Keycloak and renders the subset each user's realm roles unlock.

#![deny(dead_code)]

pub mod access;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod web;

use auth::jwt::JwtValidator;
use catalog::Catalog;
use config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Validated at startup, read-only afterwards
    pub catalog: Arc<Catalog>,
    pub jwt_validator: Arc<JwtValidator>,
    pub config: Arc<Config>,
}
