use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::catalog::RoleSet;
use crate::config::Config;

// Keycloak nests realm roles under realm_access.roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RealmAccess {
    #[serde(default)]
    pub(crate) roles: Vec<String>,
}

/// Claims read from a Keycloak access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub(crate) realm_access: Option<RealmAccess>,
}

impl Claims {
    /// Realm roles as a de-duplicated set; absent claims give an empty set
    pub fn role_set(&self) -> RoleSet {
        self.realm_access
            .as_ref()
            .map(|ra| ra.roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Used for diagnostic logging when roles are empty
    pub fn has_realm_access(&self) -> bool {
        self.realm_access.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    #[serde(default)]
    kty: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// Decoding keys by `kid`, stamped with their fetch time
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

impl KeySet {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// RS256 validator for Keycloak access tokens, backed by a cached JWKS
pub struct JwtValidator {
    certs_url: String,
    /// Keycloak public URL + realm path
    expected_issuer: String,
    /// The portal's client_id
    expected_audience: String,
    client: reqwest::Client,
    key_set: RwLock<Option<KeySet>>,
    cache_ttl: Duration,
}

impl JwtValidator {
    pub fn new(config: &Config) -> Result<Self> {
        let certs_url = format!(
            "{}/realms/{}/protocol/openid-connect/certs",
            config.keycloak_url, config.keycloak_realm
        );
        let expected_issuer = format!(
            "{}/realms/{}",
            config.keycloak_callback_url, config.keycloak_realm
        );

        let client = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(config.http_connect_timeout_secs))
            .timeout(Duration::from_secs(config.http_request_timeout_secs))
            .build()
            .context("Failed to build HTTP client for JWKS")?;

        tracing::info!(
            certs_url = %certs_url,
            expected_issuer = %expected_issuer,
            expected_audience = %config.client_id,
            jwks_cache_ttl_secs = config.jwks_cache_ttl_secs,
            "JWT validator configured"
        );

        Ok(Self {
            certs_url,
            expected_issuer,
            expected_audience: config.client_id.clone(),
            client,
            key_set: RwLock::new(None),
            cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
        })
    }

    /// Validate signature, expiry, issuer and audience, returning the claims
    pub async fn validate(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).context("Invalid token header")?;
        let kid = header.kid.context("Token missing kid")?;

        let key = match self.key_for(&kid).await? {
            Some(key) => key,
            None => {
                // Keycloak may have rotated keys since the last fetch
                tracing::warn!(kid = %kid, "Unknown kid, forcing JWKS refresh");
                self.refresh().await?;
                self.cached_key(&kid)
                    .await
                    .with_context(|| format!("Unknown key ID: {}", kid))?
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_issuer(&[&self.expected_issuer]);
        validation.set_audience(&[&self.expected_audience]);

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => {
                tracing::debug!(
                    sub = %data.claims.sub,
                    username = ?data.claims.preferred_username,
                    "Token validated"
                );
                Ok(data.claims)
            }
            Err(e) => {
                // Never log the token itself
                tracing::warn!(
                    error = ?e,
                    kid = %kid,
                    token_hash = %format!("{:x}", md5::compute(token)),
                    "Token validation failed"
                );
                anyhow::bail!("Token validation failed: {}", e)
            }
        }
    }

    /// True once a key set has been fetched (readiness)
    pub async fn is_jwks_cached(&self) -> bool {
        self.key_set.read().await.is_some()
    }

    /// Fetch the key set once at startup so readiness passes immediately
    pub async fn prefetch_jwks(&self) -> Result<()> {
        self.refresh().await
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        self.key_set
            .read()
            .await
            .as_ref()
            .and_then(|set| set.keys.get(kid).cloned())
    }

    /// Key for `kid`, refreshing first when the cache is missing or stale
    async fn key_for(&self, kid: &str) -> Result<Option<DecodingKey>> {
        let fresh = self
            .key_set
            .read()
            .await
            .as_ref()
            .map(|set| set.is_fresh(self.cache_ttl))
            .unwrap_or(false);

        if !fresh {
            tracing::info!("JWKS cache empty or expired, refreshing");
            self.refresh().await?;
        }

        Ok(self.cached_key(kid).await)
    }

    async fn refresh(&self) -> Result<()> {
        tracing::info!(url = %self.certs_url, "Fetching JWKS from Keycloak");

        let response: JwksResponse = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .context("Failed to fetch JWKS")?
            .error_for_status()
            .context("JWKS endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse JWKS")?;

        let keys = decoding_keys(response)?;
        tracing::info!(key_count = keys.len(), "JWKS refreshed");

        *self.key_set.write().await = Some(KeySet {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}

/// RSA signing keys from a JWKS document; other key types are skipped
fn decoding_keys(response: JwksResponse) -> Result<HashMap<String, DecodingKey>> {
    let mut keys = HashMap::new();
    for jwk in response.keys {
        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            tracing::debug!(kid = %jwk.kid, kty = ?jwk.kty, "Skipping non-RSA key");
            continue;
        };
        let key = DecodingKey::from_rsa_components(n, e)
            .with_context(|| format!("Invalid RSA components for kid {}", jwk.kid))?;
        keys.insert(jwk.kid, key);
    }
    Ok(keys)
}
