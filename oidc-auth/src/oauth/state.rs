//! CSRF state management for OAuth flows.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};

use crate::error::{Error, ErrorKind, OAuthErrorKind};

/// Storage for short-lived, single-use CSRF state tokens.
///
/// CRITICAL: `take_state` must read and remove in one atomic step. Two callbacks presenting
/// the same state concurrently must not both observe it.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a freshly issued state token with the store's expiry.
    async fn set_state(&self, state: &str) -> Result<(), Error>;

    /// Read the value stored for a state token without consuming it.
    ///
    /// Returns `None` when the token is unknown or expired.
    async fn get_state(&self, state: &str) -> Result<Option<String>, Error>;

    /// Remove a state token. Removing an unknown token is not an error.
    async fn delete_state(&self, state: &str) -> Result<(), Error>;

    /// Atomically read and remove a state token.
    ///
    /// The token is gone after this call whatever the outcome. Returns `None` when it was
    /// unknown or expired.
    async fn take_state(&self, state: &str) -> Result<Option<String>, Error>;

    /// Drop expired tokens, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, Error>;
}

/// Generate a cryptographically random state token.
///
/// 32 bytes from the operating system RNG, base64url encoded without padding.
pub fn generate_state() -> Result<String, Error> {
    let mut random_bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut random_bytes).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::OAuth(OAuthErrorKind::RandomGeneration),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(random_bytes))
}

#[derive(Debug, Clone)]
struct StateEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StateEntry {
    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory state store with per-entry expiration.
///
/// Cloning shares the underlying map, so one instance can serve every request.
#[derive(Clone)]
pub struct MemoryStateStore {
    states: Arc<DashMap<String, StateEntry>>,
    ttl: Duration,
}

impl MemoryStateStore {
    /// Create a new state store with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new state store with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Number of tokens currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn set_state(&self, state: &str) -> Result<(), Error> {
        let entry = StateEntry {
            value: state.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.states.insert(state.to_string(), entry);
        Ok(())
    }

    async fn get_state(&self, state: &str) -> Result<Option<String>, Error> {
        Ok(self
            .states
            .get(state)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn delete_state(&self, state: &str) -> Result<(), Error> {
        self.states.remove(state);
        Ok(())
    }

    async fn take_state(&self, state: &str) -> Result<Option<String>, Error> {
        // DashMap::remove holds the shard lock across lookup and removal.
        Ok(self
            .states
            .remove(state)
            .map(|(_, entry)| entry)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value))
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        let before = self.states.len();
        self.states.retain(|_, entry| !entry.is_expired());
        Ok(before.saturating_sub(self.states.len()))
    }
}
