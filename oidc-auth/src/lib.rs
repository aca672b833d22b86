//! # oidc-auth
//!
//! OpenID Connect client infrastructure for the login service:
//! - OAuth 2.0 authorization code flow against a single provider (URL building, code exchange)
//! - CSRF state storage contract with an in-memory implementation
//! - OIDC discovery and ID token verification against the provider's published keys
//! - HTTP client building with middleware
//!
//! ## Architecture
//!
//! This crate knows nothing about sessions or HTTP servers. The `domain` crate drives the
//! login flow through the [`oauth::Provider`] and [`oauth::StateStore`] traits, which keeps
//! the provider and the state backend swappable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oidc_auth::{
//!     http::ProviderClientBuilder,
//!     oauth::{providers::oidc, MemoryStateStore, Provider},
//!     oidc::{discovery, IdTokenVerifier, VerificationConfig},
//! };
//! ```

pub mod error;
pub mod http;
pub mod oauth;
pub mod oidc;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
