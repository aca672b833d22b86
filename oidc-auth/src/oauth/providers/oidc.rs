//! Generic OpenID Connect provider.
//!
//! Works with any provider that publishes a discovery document (Keycloak, Auth0, Entra ID,
//! Google, ...). Endpoints come from [`ProviderMetadata`]; identity tokens are checked by
//! an [`IdTokenVerifier`] bound to the provider's `jwks_uri`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth::token::{TokenResponse, Tokens};
use crate::oauth::{AuthorizationRequest, VerifiedIdToken};
use crate::oidc::{IdTokenVerifier, ProviderMetadata};

/// Client registration at the provider.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

/// Error body of a failed token request (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OpenID Connect provider.
pub struct Provider {
    credentials: ClientCredentials,
    metadata: ProviderMetadata,
    http_client: reqwest::Client,
    verifier: IdTokenVerifier,
}

impl Provider {
    /// Create a new provider.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Client ID, secret, redirect URI and scopes
    /// * `metadata` - Endpoints, usually from [`crate::oidc::discovery::discover`]
    /// * `http_client` - Client for the token endpoint; must not retry
    /// * `verifier` - Identity token verifier bound to `metadata.jwks_uri`
    pub fn new(
        credentials: ClientCredentials,
        metadata: ProviderMetadata,
        http_client: reqwest::Client,
        verifier: IdTokenVerifier,
    ) -> Self {
        Self {
            credentials,
            metadata,
            http_client,
            verifier,
        }
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }
}

fn endpoint_url(endpoint: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
    Url::parse_with_params(endpoint, params).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidConfiguration),
    })
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn authorization_url(&self, state: &str) -> Result<AuthorizationRequest, Error> {
        let scope = self.credentials.scopes.join(" ");
        let url = endpoint_url(
            &self.metadata.authorization_endpoint,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )?;

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state: state.to_string(),
        })
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret().as_str(),
            ),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .post(&self.metadata.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "Token endpoint unreachable"))?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response.json().await.map_err(|e| {
                warn!(error = %e, "Failed to parse token response");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
                }
            })?;
            info!("Exchanged authorization code for tokens");
            return Ok(body.into());
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => {
                let description = err.error_description.unwrap_or_default();
                warn!(status = %status, error = %err.error, description = %description, "Token request rejected");
                let kind = if err.error == "invalid_grant" {
                    OAuthErrorKind::InvalidGrant
                } else {
                    OAuthErrorKind::TokenExchangeFailed
                };
                Err(oauth_error(kind, &format!("{}: {}", err.error, description)))
            }
            Err(_) => {
                warn!(status = %status, "Token request failed");
                Err(oauth_error(
                    OAuthErrorKind::TokenExchangeFailed,
                    &format!("HTTP status {status}"),
                ))
            }
        }
    }

    async fn verify_id_token(&self, raw_id_token: &str) -> Result<VerifiedIdToken, Error> {
        self.verifier.verify(raw_id_token).await
    }

    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<Option<String>, Error> {
        let Some(endpoint) = self.metadata.end_session_endpoint.as_deref() else {
            return Ok(None);
        };

        let url = endpoint_url(
            endpoint,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("id_token_hint", id_token_hint),
                ("post_logout_redirect_uri", post_logout_redirect_uri),
            ],
        )?;
        Ok(Some(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpErrorKind;
    use crate::http::ProviderClientBuilder;
    use crate::oauth::Provider as _;
    use crate::oidc::{JwksCache, VerificationConfig};
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn provider(base_url: &str, end_session: bool) -> Provider {
        let builder = ProviderClientBuilder::new()
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(0);
        let metadata = ProviderMetadata {
            issuer: base_url.to_string(),
            authorization_endpoint: format!("{base_url}/auth"),
            token_endpoint: format!("{base_url}/token"),
            jwks_uri: format!("{base_url}/certs"),
            end_session_endpoint: end_session.then(|| format!("{base_url}/logout")),
        };
        let jwks = JwksCache::new(
            metadata.jwks_uri.clone(),
            builder.build_retrying().unwrap(),
            Duration::from_secs(60),
        );
        let verifier = IdTokenVerifier::new(jwks, VerificationConfig::new(base_url, "login-service"));

        Provider::new(
            ClientCredentials {
                client_id: "login-service".to_string(),
                client_secret: SecretString::new("s3cret".to_string()),
                redirect_uri: "http://localhost:8081/callback".to_string(),
                scopes: vec!["openid".to_string(), "profile".to_string()],
            },
            metadata,
            builder.build_plain().unwrap(),
            verifier,
        )
    }

    #[test]
    fn test_authorization_url_carries_all_parameters() {
        let provider = provider("https://id.example.com", true);
        let request = provider.authorization_url("abc123").unwrap();

        let url = Url::parse(&request.url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/auth");
        assert_eq!(params["client_id"], "login-service");
        assert_eq!(params["redirect_uri"], "http://localhost:8081/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid profile");
        assert_eq!(params["state"], "abc123");
        assert_eq!(request.state, "abc123");
    }

    #[test]
    fn test_end_session_url() {
        let provider = provider("https://id.example.com", true);
        let url = provider
            .end_session_url("raw.id.token", "http://localhost:8081")
            .unwrap()
            .unwrap();

        let url = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/logout");
        assert_eq!(params["client_id"], "login-service");
        assert_eq!(params["id_token_hint"], "raw.id.token");
        assert_eq!(params["post_logout_redirect_uri"], "http://localhost:8081");
    }

    #[test]
    fn test_end_session_url_without_endpoint() {
        let provider = provider("https://id.example.com", false);
        assert!(provider
            .end_session_url("raw.id.token", "http://localhost:8081")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "validcode".into()),
                Matcher::UrlEncoded("client_id".into(), "login-service".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:8081/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "access_token": "at-1",
                    "refresh_token": "rt-1",
                    "token_type": "Bearer",
                    "expires_in": 300,
                    "id_token": "raw.id.token"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tokens = provider(&server.url(), true)
            .exchange_code("validcode")
            .await
            .unwrap();

        assert_eq!(tokens.access_token.expose_secret(), "at-1");
        assert_eq!(
            tokens.id_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("raw.id.token")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_invalid_grant_is_permanent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Code not valid"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = provider(&server.url(), true)
            .exchange_code("usedcode")
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidGrant));
        assert!(!err.is_transient());
        // single attempt, never retried
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = provider(&server.url(), true)
            .exchange_code("validcode")
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_exchange_code_unparsable_success_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let err = provider(&server.url(), true)
            .exchange_code("validcode")
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidResponse));
    }

    #[tokio::test]
    async fn test_exchange_code_network_failure_is_transient() {
        // Nothing listens on port 1.
        let err = provider("http://127.0.0.1:1", true)
            .exchange_code("validcode")
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Http(HttpErrorKind::Network));
        assert!(err.is_transient());
    }
}
