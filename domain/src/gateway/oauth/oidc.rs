//! OpenID Connect provider client.
//!
//! Provides the configured provider for the login flow.

use std::str::FromStr;
use std::time::Duration;

use log::*;
use oidc_auth::{
    http::ProviderClientBuilder,
    oauth::providers::oidc::{ClientCredentials, Provider as OidcProvider},
    oidc::{discovery, Algorithm, IdTokenVerifier, JwksCache, VerificationConfig},
};
use secrecy::SecretString;
use service::config::Config;

use crate::error::{internal_error, DomainErrorKind, Error, InternalErrorKind};

/// Discover the provider at `config.issuer_url` and build a client for it.
///
/// Fails with `Internal(Config)` when the client secret is missing or an algorithm name is
/// unknown, and with an external error when discovery fails.
///
/// # Example
///
/// ```rust,ignore
/// use domain::gateway::oauth::oidc;
///
/// let provider = oidc::connect(&config).await?;
/// ```
pub async fn connect(config: &Config) -> Result<OidcProvider, Error> {
    let client_secret = config.client_secret().ok_or_else(|| {
        internal_error(InternalErrorKind::Config, "CLIENT_SECRET is not set")
    })?;
    let algorithms = signing_algorithms(&config.signing_algorithms)?;

    let builder = ProviderClientBuilder::new()
        .with_timeout(Duration::from_secs(config.provider_timeout_secs))
        .with_max_retries(config.provider_max_retries);
    let retrying_client = builder.build_retrying()?;

    let metadata = discovery::discover(&retrying_client, &config.issuer_url)
        .await
        .inspect_err(|e| error!("OIDC discovery at {} failed: {e:?}", config.issuer_url))?;
    info!(
        "Discovered OIDC provider {} (end-session endpoint: {})",
        metadata.issuer,
        metadata.end_session_endpoint.as_deref().unwrap_or("none")
    );

    let jwks = JwksCache::new(
        metadata.jwks_uri.clone(),
        retrying_client,
        Duration::from_secs(config.jwks_cache_ttl_secs),
    );
    let verifier = IdTokenVerifier::new(
        jwks,
        VerificationConfig::new(metadata.issuer.clone(), config.client_id.clone())
            .with_algorithms(algorithms)
            .with_leeway(config.clock_skew_leeway_secs),
    );

    let credentials = ClientCredentials {
        client_id: config.client_id.clone(),
        client_secret: SecretString::new(client_secret),
        redirect_uri: config.redirect_uri.clone(),
        scopes: config.scopes.clone(),
    };

    Ok(OidcProvider::new(
        credentials,
        metadata,
        builder.build_plain()?,
        verifier,
    ))
}

fn signing_algorithms(names: &[String]) -> Result<Vec<Algorithm>, Error> {
    if names.is_empty() {
        return Err(internal_error(
            InternalErrorKind::Config,
            "no signing algorithms configured",
        ));
    }

    names
        .iter()
        .map(|name| {
            Algorithm::from_str(name.trim()).map_err(|e| {
                warn!("Unknown signing algorithm {name:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalErrorKind;
    use clap::Parser;
    use mockito::Server;
    use oidc_auth::oauth::Provider as _;

    fn config(issuer_url: &str, extra: &[&str]) -> Config {
        let mut argv = vec!["oidc_login", "--issuer-url", issuer_url];
        argv.extend_from_slice(extra);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_signing_algorithms_parses_names() {
        let algorithms =
            signing_algorithms(&["RS256".to_string(), " ES256".to_string()]).unwrap();
        assert_eq!(algorithms, vec![Algorithm::RS256, Algorithm::ES256]);
    }

    #[test]
    fn test_signing_algorithms_rejects_unknown_name() {
        let err = signing_algorithms(&["RS999".to_string()]).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn test_connect_requires_client_secret() {
        let Err(err) = connect(&config("http://127.0.0.1:1", &[])).await else {
            panic!("connect succeeded without a client secret");
        };
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn test_connect_uses_discovered_endpoints() {
        let mut server = Server::new_async().await;
        let issuer = server.url();
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "issuer": issuer,
                    "authorization_endpoint": format!("{issuer}/auth"),
                    "token_endpoint": format!("{issuer}/token"),
                    "jwks_uri": format!("{issuer}/certs"),
                    "end_session_endpoint": format!("{issuer}/logout"),
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = connect(&config(&issuer, &["--client-secret", "s3cret"]))
            .await
            .unwrap();

        assert_eq!(provider.metadata().token_endpoint, format!("{issuer}/token"));
        let request = provider.authorization_url("abc123").unwrap();
        assert!(request.url.starts_with(&format!("{issuer}/auth?")));
        assert!(provider
            .end_session_url("raw.id.token", "http://localhost:8081")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_connect_fails_when_discovery_is_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(404)
            .create_async()
            .await;

        let Err(err) = connect(&config(
            &server.url(),
            &["--client-secret", "s3cret", "--provider-max-retries", "0"],
        ))
        .await
        else {
            panic!("connect succeeded without discovery");
        };
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Protocol)
        );
    }
}
