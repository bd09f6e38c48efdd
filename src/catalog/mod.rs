pub mod model;
pub mod roles;

pub use model::{
    display_name_for_key, Catalog, CatalogError, CatalogSummary, Category, ResourceDescriptor,
    CATALOG_VERSION,
};
pub use roles::RoleSet;

use crate::config::{CatalogConfig, CatalogSource};
use std::fmt;

/// Catalog shipped with the binary, used when no override is configured
const BUILTIN_CATALOG_JSON: &str = include_str!("../../catalog.json");

/// Where a loaded catalog came from (for logs only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    EnvJson,
    FilePath,
    Builtin,
}

impl fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogOrigin::EnvJson => write!(f, "CATALOG_JSON"),
            CatalogOrigin::FilePath => write!(f, "CATALOG_PATH"),
            CatalogOrigin::Builtin => write!(f, "builtin"),
        }
    }
}

impl Catalog {
    pub fn from_json(json: &str, origin: CatalogOrigin) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|source| CatalogError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn from_file(path: &str) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&json, CatalogOrigin::FilePath)
    }

    /// The embedded default catalog
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG_JSON, CatalogOrigin::Builtin)
    }
}

/// Load and validate the catalog from the configured source
///
/// The raw JSON is never logged; only the origin and a summary are.
pub fn load_catalog(config: &CatalogConfig) -> anyhow::Result<Catalog> {
    let (catalog, origin) = match &config.source {
        CatalogSource::Json(json) => (
            Catalog::from_json(json, CatalogOrigin::EnvJson)?,
            CatalogOrigin::EnvJson,
        ),
        CatalogSource::File(path) => (Catalog::from_file(path)?, CatalogOrigin::FilePath),
        CatalogSource::Builtin => (Catalog::builtin()?, CatalogOrigin::Builtin),
    };

    if let Err(error) = catalog.validate() {
        tracing::error!(
            origin = %origin,
            error = %error,
            "Catalog validation failed"
        );
        return Err(anyhow::anyhow!(
            "Catalog validation failed ({}): {}",
            origin,
            error
        ));
    }

    let summary = catalog.summary();
    tracing::info!(
        origin = %origin,
        total_portals = summary.total,
        public_portals = summary.public,
        per_category = ?summary.per_category,
        "Catalog loaded successfully"
    );

    Ok(catalog)
}
