//! HTTP client builder for talking to the identity provider.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::error::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of retries for idempotent requests.
    pub max_retries: u32,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            user_agent: format!("oidc-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client with transient-failure retries, used for discovery and key set fetches.
pub type RetryingClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for the HTTP clients used against the provider.
///
/// Two flavours come out of one configuration:
/// - [`build_plain`](Self::build_plain) for the token endpoint, with no retries
/// - [`build_retrying`](Self::build_retrying) for GETs that are safe to repeat
pub struct ProviderClientBuilder {
    config: HttpClientConfig,
}

impl ProviderClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build a client without retry middleware.
    pub fn build_plain(&self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?;
        Ok(client)
    }

    /// Build a client that retries transient failures with bounded backoff.
    ///
    /// The retry budget is three request timeouts, so a hung provider cannot hold a
    /// request longer than that.
    pub fn build_retrying(&self) -> Result<RetryingClient, Error> {
        let client = self.build_plain()?;

        let retry_policy = BackoffPolicy::new(self.config.max_retries, self.config.timeout * 3);
        let client_with_middleware = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(client_with_middleware)
    }
}

impl Default for ProviderClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
