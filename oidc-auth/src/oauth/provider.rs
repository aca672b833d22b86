//! OAuth provider trait and types.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::token::Tokens;
use crate::error::Error;

/// Authorization request with the URL to redirect the user to.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter embedded in the URL.
    pub state: String,
}

/// Claims of an identity token whose signature, issuer, audience and expiry were checked.
#[derive(Debug, Clone)]
pub struct VerifiedIdToken {
    /// All claims carried by the token.
    pub claims: Map<String, Value>,
    /// Key ID used for verification (if present in token header).
    pub kid: Option<String>,
}

impl VerifiedIdToken {
    /// The `sub` claim, if present and a string.
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }
}

/// Trait for an OpenID Connect provider.
///
/// Implementations handle:
/// - Authorization URL generation
/// - Authorization code exchange for tokens
/// - Identity token verification against the provider's published keys
/// - End-session (logout) URL generation
///
/// Errors must keep transient failures (network, timeout) distinguishable from permanent
/// ones (`invalid_grant`), see [`Error::is_transient`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the authorization URL for the given CSRF state.
    ///
    /// # Arguments
    ///
    /// * `state` - CSRF state parameter for validation
    fn authorization_url(&self, state: &str) -> Result<AuthorizationRequest, Error>;

    /// Exchange an authorization code for tokens using `grant_type=authorization_code`.
    ///
    /// Never retried: a code is single-use.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the callback
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error>;

    /// Verify a raw identity token and return its claims.
    ///
    /// # Arguments
    ///
    /// * `raw_id_token` - Compact JWS as returned by the token endpoint
    async fn verify_id_token(&self, raw_id_token: &str) -> Result<VerifiedIdToken, Error>;

    /// Build the provider's end-session URL.
    ///
    /// Returns `Ok(None)` when the provider publishes no end-session endpoint.
    ///
    /// # Arguments
    ///
    /// * `id_token_hint` - Identity token previously issued to this client
    /// * `post_logout_redirect_uri` - Where the provider sends the user afterwards
    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<Option<String>, Error>;
}
