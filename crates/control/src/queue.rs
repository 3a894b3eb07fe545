// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global session queue.
//!
//! An in-memory ordered set of pending sessions. Ordering is effective
//! priority: the priority bit first, then creation time, with ties kept in
//! insertion order. The queue is not strictly FIFO; a poll's filter may
//! skip past non-matching head elements.
//!
//! The queue itself is not synchronized. The scheduler holds it under one
//! mutex and performs match-and-remove as a single critical section.

use herd_core::{Session, SessionFilter, SessionId};
use std::cmp::Ordering;

fn compare(a: &Session, b: &Session) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.created.cmp(&b.created))
}

/// Pending sessions, ordered by effective priority.
#[derive(Debug, Default)]
pub struct SessionQueue {
    items: Vec<Session>,
}

impl SessionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.items.iter().any(|s| &s.id == id)
    }

    /// Insert a session, idempotent by ID.
    ///
    /// A session already present is replaced: a newer interaction list
    /// overwrites the older copy, and the session is repositioned in case
    /// its priority changed.
    pub fn enqueue(&mut self, session: Session) {
        self.remove(&session.id);
        let pos = self
            .items
            .partition_point(|s| compare(s, &session) != Ordering::Greater);
        self.items.insert(pos, session);
    }

    /// Remove a session by ID. No-op when absent.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let pos = self.items.iter().position(|s| &s.id == id)?;
        Some(self.items.remove(pos))
    }

    /// First session in comparator order satisfying `filter`.
    ///
    /// Non-destructive; the scheduler removes after it commits to the
    /// match, inside the same critical section.
    pub fn match_filter(&self, filter: &SessionFilter, now_ms: u64) -> Option<&Session> {
        self.items.iter().find(|s| filter.matches(s, now_ms))
    }

    /// Clone of the queue in order, for dashboards.
    pub fn snapshot(&self) -> Vec<Session> {
        self.items.clone()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
