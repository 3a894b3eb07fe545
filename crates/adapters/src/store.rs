// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relational session-store contract.
//!
//! The production backing is a SQL database owned by the external API; the
//! scheduling core only needs CRUD on sessions. [`MemorySessionStore`] is
//! the in-process reference implementation the daemon falls back to when no
//! database is wired up.

use async_trait::async_trait;
use herd_core::{Session, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from session-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Narrow relational-store contract the core consumes.
#[async_trait]
pub trait SessionStore: Clone + Send + Sync + 'static {
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;
    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn update_session(&self, session: &Session) -> Result<(), StoreError>;
}

/// In-memory session store.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.inner.lock().values().cloned().collect();
        sessions.sort_by_key(|s| s.created);
        Ok(sessions)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.lock().get(id).cloned())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        self.inner
            .lock()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.contains_key(&session.id) {
            return Err(StoreError::NotFound(session.id.clone()));
        }
        inner.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
