//! Identity token verification against the provider's JWKS.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::JwksCache;
use crate::error::{id_token_error, Error, IdTokenErrorKind};
use crate::oauth::VerifiedIdToken;

/// Claims that must be present in every identity token.
const REQUIRED_CLAIMS: [&str; 4] = ["exp", "iss", "aud", "sub"];

/// Configuration for identity token verification.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Expected `iss`, exactly as published in the discovery document.
    pub issuer: String,
    /// Expected `aud`, our client ID.
    pub audience: String,
    /// Signing algorithms accepted in the token header.
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerance in seconds for `exp`.
    pub leeway_secs: u64,
}

impl VerificationConfig {
    /// Create a config accepting RS256 with one minute of leeway.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
        }
    }

    /// Set the accepted signing algorithms.
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Set the clock skew tolerance.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}

/// Verifies identity tokens: signature, issuer, audience and expiry.
#[derive(Clone)]
pub struct IdTokenVerifier {
    jwks: JwksCache,
    config: VerificationConfig,
}

impl IdTokenVerifier {
    pub fn new(jwks: JwksCache, config: VerificationConfig) -> Self {
        Self { jwks, config }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Verify a compact JWS identity token.
    ///
    /// Claims are only returned once every check passed.
    ///
    /// # Errors
    ///
    /// - `IdToken(Malformed)` - not a JWS or undecodable payload
    /// - `IdToken(UnsupportedAlgorithm)` - header `alg` not in the accepted list
    /// - `IdToken(KeyNotFound)` - no published key matches the header
    /// - `IdToken(InvalidSignature | Expired | InvalidIssuer | InvalidAudience | MissingClaim)`
    /// - `Http(_)` - the key set could not be fetched
    #[instrument(skip_all)]
    pub async fn verify(&self, raw_id_token: &str) -> Result<VerifiedIdToken, Error> {
        let header = decode_header(raw_id_token)?;

        if !self.config.algorithms.contains(&header.alg) {
            warn!(alg = ?header.alg, "Rejected identity token algorithm");
            return Err(id_token_error(
                IdTokenErrorKind::UnsupportedAlgorithm,
                &format!("algorithm {:?} is not accepted", header.alg),
            ));
        }

        let jwk = self
            .jwks
            .find_signing_key(header.kid.as_deref(), header.alg)
            .await?
            .ok_or_else(|| {
                warn!(kid = ?header.kid, "No signing key for identity token");
                id_token_error(
                    IdTokenErrorKind::KeyNotFound,
                    header.kid.as_deref().unwrap_or("no kid"),
                )
            })?;

        let decoding_key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        validation.leeway = self.config.leeway_secs;

        let token_data = decode::<Map<String, Value>>(raw_id_token, &decoding_key, &validation)
            .inspect_err(|e| warn!(error = %e, "Identity token rejected"))?;

        debug!(kid = ?header.kid, "Identity token verified");

        Ok(VerifiedIdToken {
            claims: token_data.claims,
            kid: header.kid,
        })
    }
}
