//! Per-request session derived from a validated access token
//!
//! A `Session` is built by the extractor for each request and handed to the
//! handlers explicitly; nothing about it is cached process-wide.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use super::jwt::Claims;
use crate::catalog::RoleSet;

/// Role that unlocks the admin page
pub const ADMIN_ROLE: &str = "admin";

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Comfortably within its lifetime
    Valid,
    /// Still usable, but should be refreshed before it lapses
    RefreshDue,
    Expired,
}

/// Identity details shown in the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

impl UserProfile {
    /// Full name, then email, then username, then the subject id
    pub fn display_name(&self) -> &str {
        [&self.full_name, &self.email, &self.username]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|s| !s.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub profile: UserProfile,
    roles: RoleSet,
    /// Unix seconds
    expires_at: u64,
    issued_at: Option<u64>,
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Session {
    pub fn new(profile: UserProfile, roles: RoleSet, expires_at: u64) -> Self {
        Self {
            profile,
            roles,
            expires_at,
            issued_at: None,
        }
    }

    pub fn with_issued_at(mut self, issued_at: Option<u64>) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn from_claims(claims: &Claims) -> Self {
        let profile = UserProfile {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            first_name: claims.given_name.clone(),
            last_name: claims.family_name.clone(),
            full_name: claims.name.clone(),
            username: claims.preferred_username.clone(),
        };
        Self::new(profile, claims.role_set(), claims.exp).with_issued_at(claims.iat)
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Lifecycle position at `now`
    ///
    /// A token whose whole lifetime fits inside `min_validity_secs` is never
    /// `RefreshDue`: a refresh would issue another token just as short.
    pub fn status(&self, now: u64, min_validity_secs: u64) -> SessionStatus {
        if now >= self.expires_at {
            SessionStatus::Expired
        } else if self.expires_at - now < min_validity_secs
            && self.outlives_threshold(min_validity_secs)
        {
            SessionStatus::RefreshDue
        } else {
            SessionStatus::Valid
        }
    }

    /// Unknown lifetimes (no `iat`) are assumed to be long enough
    fn outlives_threshold(&self, min_validity_secs: u64) -> bool {
        self.issued_at
            .map(|iat| self.expires_at.saturating_sub(iat) > min_validity_secs)
            .unwrap_or(true)
    }

    /// Granted roles, or an empty set once the session has expired
    pub fn current_role_set(&self, now: u64) -> RoleSet {
        if now >= self.expires_at {
            RoleSet::empty()
        } else {
            self.roles.clone()
        }
    }

    pub fn has_role(&self, role: &str, now: u64) -> bool {
        now < self.expires_at && self.roles.contains(role)
    }

    pub fn is_admin(&self, now: u64) -> bool {
        self.has_role(ADMIN_ROLE, now)
    }

    /// Role summary for the header, independent of expiry
    pub fn display_roles(&self) -> String {
        self.roles.display_roles()
    }
}
