//! In-memory [`SessionStore`] backed by a concurrent map.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::*;

use crate::error::Error;
use crate::session::{SessionRecord, SessionStore};

/// Process-local session storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save_session(&self, subject: &str, record: SessionRecord) -> Result<(), Error> {
        if self.sessions.insert(subject.to_string(), record).is_some() {
            debug!("Replaced existing session for subject {subject}");
        }
        Ok(())
    }

    async fn get_session(&self, subject: &str) -> Result<Option<SessionRecord>, Error> {
        Ok(self
            .sessions
            .get(subject)
            .filter(|record| !record.is_expired())
            .map(|record| record.clone()))
    }

    async fn delete_session(&self, subject: &str) -> Result<(), Error> {
        self.sessions.remove(subject);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired());
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
