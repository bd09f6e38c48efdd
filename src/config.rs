use std::env;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Source for the portal catalog
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// Catalog provided as JSON string via CATALOG_JSON env var
    Json(String),
    /// Catalog loaded from file path via CATALOG_PATH env var
    File(String),
    /// Catalog embedded in the binary
    Builtin,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub source: CatalogSource,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    pub server_host: String,
    pub server_port: u16,

    // Portal public URL (for logout redirects)
    pub portal_public_url: String,

    // Keycloak configuration
    pub keycloak_url: String, // Internal URL for server-to-server (http://keycloak:8080)
    pub keycloak_callback_url: String, // Public URL for browser redirects
    pub keycloak_realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,

    // Link shown on the admin page
    pub admin_console_url: String,

    // Cookie configuration (None = host-only cookie, Some = domain cookie)
    pub cookie_domain: Option<String>,

    // HTTP client timeout configuration (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,

    pub jwks_cache_ttl_secs: u64,

    // Sessions closer than this to expiry are refreshed
    pub token_min_validity_secs: u64,

    pub catalog: CatalogConfig,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
}

fn parsed_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    lookup(name)
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

/// Origin of a URL (scheme + authority), or the input when it has no path
fn origin_of(url: &str) -> String {
    url.find("://")
        .and_then(|scheme_end| {
            url[scheme_end + 3..]
                .find('/')
                .map(|path_start| url[..scheme_end + 3 + path_start].to_string())
        })
        .unwrap_or_else(|| url.to_string())
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        // Trailing slashes would double up in the Keycloak endpoint paths
        let keycloak_url = required(&lookup, "KEYCLOAK_URL")?
            .trim_end_matches('/')
            .to_string();
        let keycloak_callback_url = required(&lookup, "KEYCLOAK_CALLBACK_URL")?
            .trim_end_matches('/')
            .to_string();
        let keycloak_realm = required(&lookup, "KEYCLOAK_REALM")?;
        let client_id = required(&lookup, "CLIENT_ID")?;
        let client_secret = required(&lookup, "CLIENT_SECRET")?;
        let redirect_uri = required(&lookup, "REDIRECT_URI")?;

        // e.g., http://portal.localhost/auth/callback -> http://portal.localhost
        let portal_public_url = lookup("PORTAL_PUBLIC_URL")
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| origin_of(&redirect_uri));

        let admin_console_url = lookup("ADMIN_CONSOLE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{}/admin/master/console/#/{}",
                    keycloak_callback_url, keycloak_realm
                )
            });

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parsed_or(&lookup, "SERVER_PORT", 3000u16);

        let cookie_domain = lookup("COOKIE_DOMAIN").filter(|s| !s.is_empty());

        let http_connect_timeout_secs = parsed_or(&lookup, "HTTP_CONNECT_TIMEOUT_SECS", 10u64);
        let http_request_timeout_secs = parsed_or(&lookup, "HTTP_REQUEST_TIMEOUT_SECS", 30u64);
        let jwks_cache_ttl_secs = parsed_or(&lookup, "JWKS_CACHE_TTL_SECS", 3600u64);
        let token_min_validity_secs = parsed_or(&lookup, "TOKEN_MIN_VALIDITY_SECS", 30u64);

        // Catalog: JSON env var, then file path, then the embedded default
        let catalog_source = if let Some(json) = lookup("CATALOG_JSON").filter(|s| !s.is_empty()) {
            CatalogSource::Json(json)
        } else if let Some(path) = lookup("CATALOG_PATH").filter(|s| !s.is_empty()) {
            CatalogSource::File(path)
        } else {
            CatalogSource::Builtin
        };

        Ok(Config {
            environment,
            server_host,
            server_port,
            portal_public_url,
            keycloak_url,
            keycloak_callback_url,
            keycloak_realm,
            client_id,
            client_secret,
            redirect_uri,
            admin_console_url,
            cookie_domain,
            http_connect_timeout_secs,
            http_request_timeout_secs,
            jwks_cache_ttl_secs,
            token_min_validity_secs,
            catalog: CatalogConfig {
                source: catalog_source,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get cookie security flags based on environment
    pub fn cookie_secure_flag(&self) -> &str {
        if self.is_production() {
            "; Secure"
        } else {
            ""
        }
    }

    /// Get cookie domain attribute string (empty if host-only cookie)
    pub fn cookie_domain_attr(&self) -> String {
        match &self.cookie_domain {
            Some(domain) => format!("; Domain={}", domain),
            None => String::new(),
        }
    }

    /// Build a `Set-Cookie` value with the portal's standard attributes
    ///
    /// A `max_age` of zero deletes the cookie.
    pub fn cookie(&self, name: &str, value: &str, path: &str, max_age: u64) -> String {
        format!(
            "{}={}; HttpOnly; Path={}; Max-Age={}; SameSite=Lax{}{}",
            name,
            value,
            path,
            max_age,
            self.cookie_domain_attr(),
            self.cookie_secure_flag()
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
