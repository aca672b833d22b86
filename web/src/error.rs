use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use domain::error::{DomainErrorKind, Error as DomainError, ExternalErrorKind, FlowErrorKind};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    // Every login failure answers 500. Only the message tells them apart.
    fn message(&self) -> &'static str {
        match &self.0.error_kind {
            DomainErrorKind::Flow(flow_error_kind) => match flow_error_kind {
                FlowErrorKind::InvalidInput => "Missing state or code parameter",
                FlowErrorKind::InvalidState => "Invalid or expired state",
                FlowErrorKind::TokenInvalid => "Identity token verification failed",
                FlowErrorKind::Claims => "Identity token lacks required claims",
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network => "Identity provider unavailable",
                ExternalErrorKind::Exchange => "Authorization code was rejected",
                ExternalErrorKind::Protocol => "Unexpected identity provider response",
            },
            DomainErrorKind::Internal(_) => "Internal server error",
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self.0.error_kind {
            DomainErrorKind::Flow(_) => warn!("Login request rejected: {:?}", self.0),
            _ => error!("Login request failed: {:?}", self.0),
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.message() })),
        )
            .into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
