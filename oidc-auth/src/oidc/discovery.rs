//! OIDC Discovery for fetching provider metadata.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{discovery_error, DiscoveryErrorKind, Error, ErrorKind};
use crate::http::RetryingClient;

/// Endpoints published in `/.well-known/openid-configuration`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Get the well-known configuration URL for an issuer.
pub fn well_known_url(issuer_url: &str) -> String {
    let issuer_url = issuer_url.trim_end_matches('/');
    format!("{issuer_url}/.well-known/openid-configuration")
}

/// Discover provider metadata from the issuer URL.
///
/// The `issuer` in the document must match `issuer_url` (ignoring a trailing slash),
/// otherwise tokens could be verified against another provider's keys.
#[instrument(skip(http_client))]
pub async fn discover(http_client: &RetryingClient, issuer_url: &str) -> Result<ProviderMetadata, Error> {
    let response = http_client.get(well_known_url(issuer_url)).send().await?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "Discovery document request failed");
        return Err(discovery_error(
            DiscoveryErrorKind::InvalidDocument,
            &format!("HTTP status {}", response.status()),
        ));
    }

    let metadata: ProviderMetadata = response.json().await.map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Discovery(DiscoveryErrorKind::InvalidDocument),
    })?;

    if metadata.issuer.trim_end_matches('/') != issuer_url.trim_end_matches('/') {
        warn!(
            expected = %issuer_url,
            actual = %metadata.issuer,
            "Issuer mismatch in discovery document"
        );
        return Err(discovery_error(
            DiscoveryErrorKind::IssuerMismatch,
            &format!("expected {issuer_url}, got {}", metadata.issuer),
        ));
    }

    info!(
        authorization_endpoint = %metadata.authorization_endpoint,
        token_endpoint = %metadata.token_endpoint,
        jwks_uri = %metadata.jwks_uri,
        "Discovered OIDC endpoints"
    );

    Ok(metadata)
}
