//! Login sessions created by a successful callback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use crate::error::Error;

/// Display profile taken from verified identity claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub national_id: String,
}

/// Server-side record of an authenticated user, keyed by subject.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub subject: String,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for login sessions.
///
/// Saving under an existing subject replaces the previous record, so a user has at most
/// one live session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, subject: &str, record: SessionRecord) -> Result<(), Error>;

    /// Returns `None` for unknown or expired sessions.
    async fn get_session(&self, subject: &str) -> Result<Option<SessionRecord>, Error>;

    /// Removing an unknown session is not an error.
    async fn delete_session(&self, subject: &str) -> Result<(), Error>;

    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, Error>;
}
