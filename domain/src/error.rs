//! Error types for the `domain` layer.
use oidc_auth::error::{
    Error as OidcAuthError, ErrorKind as OidcAuthErrorKind, HttpErrorKind, OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field holds the original error. `oidc-auth` errors are
/// translated here so that `web` never depends on `oidc-auth` directly; `web` uses the
/// `error_kind` to pick the HTTP status returned to the browser.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// The login attempt itself is invalid. Restart from the login endpoint.
    Flow(FlowErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Rejections of a login attempt.
#[derive(Debug, PartialEq)]
pub enum FlowErrorKind {
    /// Required callback parameters are missing or empty.
    InvalidInput,
    /// The state token is unknown, expired, already used or mismatched.
    InvalidState,
    /// The identity token failed signature, issuer, audience or expiry checks.
    TokenInvalid,
    /// Verified claims lack a required field or carry one of the wrong type.
    Claims,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Store,
    Random,
    Config,
    Other(String),
}

/// Failures talking to the identity provider.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// Transport failure or timeout. Trying again later may succeed.
    Network,
    /// The provider rejected the code exchange (`invalid_grant` and friends).
    Exchange,
    /// The provider answered with something that breaks the protocol.
    Protocol,
}

impl Error {
    /// True for provider failures that may clear up on a fresh attempt.
    pub fn is_transient(&self) -> bool {
        self.error_kind == DomainErrorKind::External(ExternalErrorKind::Network)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `oidc-auth` layer to the `domain` layer.
impl From<OidcAuthError> for Error {
    fn from(err: OidcAuthError) -> Self {
        let error_kind = match &err.error_kind {
            OidcAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build HTTP client".to_string()),
            ),
            OidcAuthErrorKind::Http(HttpErrorKind::Network)
            | OidcAuthErrorKind::Http(HttpErrorKind::Timeout) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            OidcAuthErrorKind::Http(HttpErrorKind::RequestFailed) => {
                DomainErrorKind::External(ExternalErrorKind::Protocol)
            }
            OidcAuthErrorKind::OAuth(OAuthErrorKind::InvalidGrant)
            | OidcAuthErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed) => {
                DomainErrorKind::External(ExternalErrorKind::Exchange)
            }
            OidcAuthErrorKind::OAuth(OAuthErrorKind::InvalidResponse) => {
                DomainErrorKind::External(ExternalErrorKind::Protocol)
            }
            OidcAuthErrorKind::OAuth(OAuthErrorKind::InvalidConfiguration) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            OidcAuthErrorKind::OAuth(OAuthErrorKind::RandomGeneration) => {
                DomainErrorKind::Internal(InternalErrorKind::Random)
            }
            OidcAuthErrorKind::IdToken(_) => DomainErrorKind::Flow(FlowErrorKind::TokenInvalid),
            OidcAuthErrorKind::Discovery(_) => {
                DomainErrorKind::External(ExternalErrorKind::Protocol)
            }
            OidcAuthErrorKind::Store(_) => DomainErrorKind::Internal(InternalErrorKind::Store),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

pub(crate) fn flow_error(kind: FlowErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Flow(kind),
    }
}

pub(crate) fn external_error(kind: ExternalErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::External(kind),
    }
}

pub(crate) fn internal_error(kind: InternalErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(kind),
    }
}
