//! JWKS caching for the provider's signing keys.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::Algorithm;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, ErrorKind, HttpErrorKind};
use crate::http::RetryingClient;

/// Minimum time between two fetches triggered by an unknown `kid`.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Key set cache bound to a single `jwks_uri`.
///
/// Keys are reused until the TTL passes. A token signed with a key the cache has not seen
/// triggers one refresh, rate limited so forged `kid` values cannot hammer the provider.
#[derive(Clone)]
pub struct JwksCache {
    jwks_uri: String,
    http_client: RetryingClient,
    ttl: Duration,
    cached: Arc<RwLock<Option<CachedJwks>>>,
}

impl JwksCache {
    pub fn new(jwks_uri: impl Into<String>, http_client: RetryingClient, ttl: Duration) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            http_client,
            ttl,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Get keys from cache or fetch them.
    pub async fn keys(&self) -> Result<JwkSet, Error> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() <= self.ttl {
                    debug!(jwks_uri = %self.jwks_uri, "JWKS cache hit");
                    return Ok(entry.keys.clone());
                }
            }
        }

        debug!(jwks_uri = %self.jwks_uri, "JWKS cache miss, fetching");
        self.refresh().await
    }

    /// Fetch the key set and replace the cached copy.
    pub async fn refresh(&self) -> Result<JwkSet, Error> {
        let response = self.http_client.get(&self.jwks_uri).send().await?;

        if !response.status().is_success() {
            warn!(jwks_uri = %self.jwks_uri, status = %response.status(), "JWKS fetch failed");
            return Err(Error {
                source: Some(format!("HTTP status {}", response.status()).into()),
                error_kind: ErrorKind::Http(HttpErrorKind::RequestFailed),
            });
        }

        let keys: JwkSet = response.json().await?;

        let mut cached = self.cached.write().await;
        *cached = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        info!(jwks_uri = %self.jwks_uri, key_count = keys.keys.len(), "JWKS cached");
        Ok(keys)
    }

    /// Find a key able to verify a token signed with `alg`, optionally by key ID.
    pub async fn find_signing_key(
        &self,
        kid: Option<&str>,
        alg: Algorithm,
    ) -> Result<Option<Jwk>, Error> {
        let keys = self.keys().await?;
        if let Some(jwk) = select_signing_key(&keys, kid, alg) {
            return Ok(Some(jwk.clone()));
        }

        if kid.is_none() || !self.refresh_allowed().await {
            return Ok(None);
        }

        debug!(kid = ?kid, "Unknown key id, refreshing JWKS");
        let keys = self.refresh().await?;
        Ok(select_signing_key(&keys, kid, alg).cloned())
    }

    async fn refresh_allowed(&self) -> bool {
        self.cached
            .read()
            .await
            .as_ref()
            .map_or(true, |entry| entry.fetched_at.elapsed() >= MIN_REFRESH_INTERVAL)
    }
}

fn select_signing_key<'a>(keys: &'a JwkSet, kid: Option<&str>, alg: Algorithm) -> Option<&'a Jwk> {
    keys.keys
        .iter()
        .filter(|jwk| kid.map_or(true, |kid| jwk.common.key_id.as_deref() == Some(kid)))
        .find(|jwk| verifies(jwk, alg))
}

fn verifies(jwk: &Jwk, alg: Algorithm) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(alg, Algorithm::ES256 | Algorithm::ES384)
        }
        AlgorithmParameters::OctetKey(_) => {
            matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
        }
        AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
    }
}
