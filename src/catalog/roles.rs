//! Role sets shared by the catalog (required roles) and sessions (granted roles).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix Keycloak uses for its built-in composite roles (e.g. `default-roles-<realm>`)
const BUILTIN_ROLE_PREFIX: &str = "default";

/// Label shown when a user holds no role worth displaying
const FALLBACK_ROLE_LABEL: &str = "User";

/// De-duplicated set of case-sensitive role names
///
/// Role names are opaque: no vocabulary check is performed, so a role the
/// catalog has never heard of simply never matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True when at least one role appears in both sets
    pub fn intersects(&self, other: &RoleSet) -> bool {
        // Iterate the smaller side
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|role| large.contains(role))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Roles suitable for the user header, hiding Keycloak built-ins
    pub fn display_roles(&self) -> String {
        let visible: Vec<&str> = self
            .iter()
            .filter(|r| !r.starts_with(BUILTIN_ROLE_PREFIX))
            .collect();

        if visible.is_empty() {
            FALLBACK_ROLE_LABEL.to_string()
        } else {
            visible.join(", ")
        }
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
