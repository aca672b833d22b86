//! Login flow orchestration.
//!
//! `web` talks to this crate only. Provider and state plumbing from `oidc-auth` is reached
//! through [`gateway`], sessions through [`session::SessionStore`].

pub use login_flow::{FlowController, FlowSettings, LoginOutcome, LogoutRedirect};
pub use session::{Profile, SessionRecord, SessionStore};
pub use session_store::MemorySessionStore;

pub mod claims;
pub mod error;
pub mod login_flow;
pub mod session;
pub mod session_store;

pub mod gateway;
