//! OAuth token types returned by the code exchange.

mod tokens;

pub use tokens::{TokenResponse, Tokens};
