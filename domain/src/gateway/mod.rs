//! Adapters to systems outside this service.

pub mod oauth;

pub use oauth::{AuthorizationRequest, Provider, StateStore, Tokens, VerifiedIdToken};
