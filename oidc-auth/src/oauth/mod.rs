//! OAuth 2.0 authorization code flow infrastructure.
//!
//! Provides the provider contract, CSRF state storage and token types for a single
//! OpenID Connect provider.

mod provider;
mod state;

pub mod providers;
pub mod token;

pub use provider::{AuthorizationRequest, Provider, VerifiedIdToken};
pub use state::{generate_state, MemoryStateStore, StateStore};
