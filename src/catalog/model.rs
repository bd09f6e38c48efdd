//! Catalog data model
//!
//! The catalog is static configuration: it is parsed and validated once at
//! startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::roles::RoleSet;

/// The only catalog format version this build understands
pub const CATALOG_VERSION: &str = "1";

/// Display grouping for a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Analytics,
    Operations,
    Client,
    Admin,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Analytics,
        Category::Operations,
        Category::Client,
        Category::Admin,
    ];

    /// Stable key used in the catalog JSON and the API
    pub fn key(&self) -> &'static str {
        match self {
            Category::Analytics => "analytics",
            Category::Operations => "operations",
            Category::Client => "client",
            Category::Admin => "admin",
        }
    }

    /// Human-readable section title
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Analytics => "Analytics & Reporting",
            Category::Operations => "Operations & Management",
            Category::Client => "Client Services",
            Category::Admin => "Administration",
        }
    }

    pub fn from_key(key: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Section title for a raw category key, falling back to the key itself
pub fn display_name_for_key(key: &str) -> &str {
    Category::from_key(key)
        .map(|c| c.display_name())
        .unwrap_or(key)
}

/// A link to one internal tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceDescriptor {
    /// Stable identifier, unique within the catalog
    pub id: String,
    /// Display name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Absolute or root-relative address, passed through untouched
    pub url: String,
    /// Icon (emoji)
    pub icon: String,
    /// Roles of which the user needs at least one; empty means every
    /// authenticated user
    #[serde(default, alias = "roles")]
    pub required_roles: RoleSet,
    pub category: Category,
}

impl ResourceDescriptor {
    pub fn is_public(&self) -> bool {
        self.required_roles.is_empty()
    }
}

/// Validation failures detected while loading a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported catalog version \"{0}\" (expected \"1\")")]
    UnsupportedVersion(String),

    #[error("portal at position {0} has an empty id")]
    EmptyId(usize),

    #[error("duplicate portal id \"{0}\"")]
    DuplicateId(String),

    #[error("portal \"{id}\" has an empty {field}")]
    EmptyField { id: String, field: &'static str },

    #[error("portal \"{0}\" lists an empty role name")]
    EmptyRole(String),
}

/// Ordered collection of portals; order is display order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Catalog {
    pub version: String,
    pub portals: Vec<ResourceDescriptor>,
}

/// Non-sensitive catalog statistics for startup logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total: usize,
    pub public: usize,
    pub per_category: Vec<(Category, usize)>,
}

impl Catalog {
    /// Check every load-time invariant, reporting the first violation
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.version != CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion(self.version.clone()));
        }

        let mut seen = HashSet::with_capacity(self.portals.len());
        for (index, portal) in self.portals.iter().enumerate() {
            if portal.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(index));
            }
            if !seen.insert(portal.id.as_str()) {
                return Err(CatalogError::DuplicateId(portal.id.clone()));
            }
            if portal.name.trim().is_empty() {
                return Err(CatalogError::EmptyField {
                    id: portal.id.clone(),
                    field: "name",
                });
            }
            if portal.url.trim().is_empty() {
                return Err(CatalogError::EmptyField {
                    id: portal.id.clone(),
                    field: "url",
                });
            }
            if portal.required_roles.iter().any(|r| r.trim().is_empty()) {
                return Err(CatalogError::EmptyRole(portal.id.clone()));
            }
        }

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.portals.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    pub fn summary(&self) -> CatalogSummary {
        let per_category = Category::ALL
            .into_iter()
            .map(|c| (c, self.portals.iter().filter(|p| p.category == c).count()))
            .filter(|(_, n)| *n > 0)
            .collect();

        CatalogSummary {
            total: self.portals.len(),
            public: self.portals.iter().filter(|p| p.is_public()).count(),
            per_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portal(id: &str, roles: &[&str], category: Category) -> ResourceDescriptor {
        ResourceDescriptor {
            id: id.to_string(),
            name: format!("{} portal", id),
            description: String::new(),
            url: format!("https://{}.example.com", id),
            icon: "📦".to_string(),
            required_roles: roles.iter().copied().collect(),
            category,
        }
    }

    fn catalog(portals: Vec<ResourceDescriptor>) -> Catalog {
        Catalog {
            version: CATALOG_VERSION.to_string(),
            portals,
        }
    }

    #[test]
    fn test_category_keys_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_key(category.key()), Some(category));
        }
        assert_eq!(Category::from_key("finance"), None);
    }

    #[test]
    fn test_display_name_for_unknown_key_falls_back() {
        assert_eq!(display_name_for_key("client"), "Client Services");
        assert_eq!(display_name_for_key("finance"), "finance");
    }

    #[test]
    fn test_descriptor_accepts_legacy_roles_field() {
        let json = r#"{
            "id": "media",
            "name": "Media Storage",
            "description": "Project media",
            "url": "https://media.example.com",
            "icon": "💾",
            "roles": ["editor"],
            "category": "operations"
        }"#;
        let descriptor: ResourceDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.required_roles.contains("editor"));
        assert_eq!(descriptor.category, Category::Operations);
    }

    #[test]
    fn test_descriptor_missing_roles_is_public() {
        let json = r#"{
            "id": "client",
            "name": "Client Portal",
            "description": "",
            "url": "https://client.example.com",
            "icon": "👥",
            "category": "client"
        }"#;
        let descriptor: ResourceDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.is_public());
    }

    #[test]
    fn test_descriptor_rejects_unknown_category() {
        let json = r#"{
            "id": "x", "name": "X", "description": "", "url": "/x", "icon": "",
            "category": "finance"
        }"#;
        assert!(serde_json::from_str::<ResourceDescriptor>(json).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_catalog() {
        let c = catalog(vec![
            portal("a", &["admin"], Category::Admin),
            portal("b", &[], Category::Client),
        ]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_id() {
        let c = catalog(vec![
            portal("a", &[], Category::Client),
            portal("a", &["admin"], Category::Admin),
        ]);
        assert!(matches!(c.validate(), Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut p = portal("a", &[], Category::Client);
        p.name = "  ".to_string();
        let c = catalog(vec![p]);
        assert!(matches!(
            c.validate(),
            Err(CatalogError::EmptyField { field: "name", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_role_name() {
        let c = catalog(vec![portal("a", &[""], Category::Client)]);
        assert!(matches!(c.validate(), Err(CatalogError::EmptyRole(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let mut c = catalog(vec![]);
        c.version = "2".to_string();
        assert!(matches!(
            c.validate(),
            Err(CatalogError::UnsupportedVersion(v)) if v == "2"
        ));
    }

    #[test]
    fn test_summary_counts() {
        let c = catalog(vec![
            portal("a", &["admin"], Category::Admin),
            portal("b", &[], Category::Client),
            portal("c", &[], Category::Client),
        ]);
        let summary = c.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.public, 2);
        assert_eq!(
            summary.per_category,
            vec![(Category::Client, 2), (Category::Admin, 1)]
        );
    }
}
