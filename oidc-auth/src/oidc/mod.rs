//! OpenID Connect specifics: provider discovery and identity token verification.

pub mod discovery;
mod jwks;
mod verifier;

pub use discovery::ProviderMetadata;
pub use jsonwebtoken::Algorithm;
pub use jwks::JwksCache;
pub use verifier::{IdTokenVerifier, VerificationConfig};
