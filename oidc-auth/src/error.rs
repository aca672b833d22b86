//! Error types for the `oidc-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for oidc-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in oidc-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    IdToken(IdTokenErrorKind),
    Discovery(DiscoveryErrorKind),
    Store(StoreErrorKind),
    Http(HttpErrorKind),
}

/// Errors from OAuth operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The provider answered the token request with an error other than `invalid_grant`.
    TokenExchangeFailed,
    /// The authorization code was rejected: expired, revoked or already used.
    InvalidGrant,
    /// The provider answered with a body that could not be understood.
    InvalidResponse,
    /// Client settings (URLs, credentials) are unusable.
    InvalidConfiguration,
    /// The operating system random source failed.
    RandomGeneration,
}

/// Errors from ID token verification.
#[derive(Debug, PartialEq)]
pub enum IdTokenErrorKind {
    Malformed,
    UnsupportedAlgorithm,
    KeyNotFound,
    InvalidSignature,
    Expired,
    InvalidIssuer,
    InvalidAudience,
    MissingClaim,
}

/// Errors from OIDC discovery.
#[derive(Debug, PartialEq)]
pub enum DiscoveryErrorKind {
    InvalidDocument,
    IssuerMismatch,
}

/// Errors from state store operations.
#[derive(Debug, PartialEq)]
pub enum StoreErrorKind {
    Unavailable,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Timeout,
    Network,
}

impl Error {
    /// Returns true when retrying the same request later could succeed.
    ///
    /// Network failures and timeouts are transient; provider rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Http(HttpErrorKind::Network) | ErrorKind::Http(HttpErrorKind::Timeout)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::IdToken(kind) => write!(f, "ID token error: {:?}", kind),
            ErrorKind::Discovery(kind) => write!(f, "Discovery error: {:?}", kind),
            ErrorKind::Store(kind) => write!(f, "Store error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else if err.is_connect() || err.is_request() {
            ErrorKind::Http(HttpErrorKind::Network)
        } else {
            // Body and decode failures: the provider answered, just not usefully.
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

        let kind = match err.kind() {
            JwtErrorKind::InvalidSignature => IdTokenErrorKind::InvalidSignature,
            JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                IdTokenErrorKind::Expired
            }
            JwtErrorKind::InvalidIssuer => IdTokenErrorKind::InvalidIssuer,
            JwtErrorKind::InvalidAudience => IdTokenErrorKind::InvalidAudience,
            JwtErrorKind::MissingRequiredClaim(_) => IdTokenErrorKind::MissingClaim,
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                IdTokenErrorKind::UnsupportedAlgorithm
            }
            _ => IdTokenErrorKind::Malformed,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::IdToken(kind),
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create ID token errors.
pub fn id_token_error(kind: IdTokenErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::IdToken(kind),
    }
}

/// Helper function to create discovery errors.
pub fn discovery_error(kind: DiscoveryErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Discovery(kind),
    }
}

/// Helper function to create store errors.
pub fn store_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Store(StoreErrorKind::Unavailable),
    }
}
