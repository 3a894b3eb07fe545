// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push-channel event envelope.

use crate::owner::OwnerId;
use crate::session::{Session, SessionId};
use crate::task::RunnerTaskResponse;
use serde::{Deserialize, Serialize};

/// Event fanned out to connected clients over the push channel.
///
/// Serializes with `{"type": "...", ...fields}` format. The websocket
/// transport itself is an external collaborator; the core only produces
/// these envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebsocketEvent {
    /// A session changed: new content streamed, progress moved, or the
    /// session terminated.
    SessionUpdate {
        owner: OwnerId,
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<Session>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<RunnerTaskResponse>,
    },
}

impl WebsocketEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            WebsocketEvent::SessionUpdate { session_id, .. } => session_id,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        match self {
            WebsocketEvent::SessionUpdate { owner, .. } => owner,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
