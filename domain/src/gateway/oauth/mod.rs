//! OpenID Connect authentication gateway.
//!
//! Re-exports provider types from oidc-auth and builds the configured provider.

pub mod oidc;

// Re-export OAuth types from oidc-auth
pub use oidc_auth::oauth::{
    generate_state, token::Tokens, AuthorizationRequest, MemoryStateStore, Provider, StateStore,
    VerifiedIdToken,
};
