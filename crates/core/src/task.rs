// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner task and task response envelopes.
//!
//! A [`RunnerTask`] is what a model child process consumes for one session
//! turn. A [`RunnerTaskResponse`] is what it emits back: zero or more
//! `stream` and `progress` envelopes followed by exactly one terminal
//! `result` (success or error).

use crate::owner::OwnerId;
use crate::session::{InteractionId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The unit a model child process executes for one session turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerTask {
    pub session_id: SessionId,
    #[serde(default)]
    pub prompt: String,
    /// Local path of the fine-tune artifact to load, empty for none.
    #[serde(default)]
    pub lora_dir: String,
    /// Local path of the training dataset, finetune mode only.
    #[serde(default)]
    pub dataset_dir: String,
}

/// Kind of a task response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskResponseType {
    Stream,
    Progress,
    Result,
}

impl fmt::Display for TaskResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskResponseType::Stream => write!(f, "stream"),
            TaskResponseType::Progress => write!(f, "progress"),
            TaskResponseType::Result => write!(f, "result"),
        }
    }
}

/// One envelope emitted by a model child process.
///
/// Per session, `result` is terminal and emitted exactly once; anything
/// arriving afterwards with the same session ID is dropped. Delivery is
/// at-least-once with per-session emission order preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerTaskResponse {
    #[serde(rename = "type")]
    pub kind: TaskResponseType,
    pub session_id: SessionId,
    #[serde(default)]
    pub interaction_id: InteractionId,
    #[serde(default)]
    pub owner: OwnerId,
    #[serde(default)]
    pub message: String,
    /// 0 to 100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// Fine-tune artifact produced by this turn, finetune mode only.
    #[serde(default)]
    pub lora_dir: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub done: bool,
}

impl RunnerTaskResponse {
    /// A bare stream chunk.
    pub fn stream(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            kind: TaskResponseType::Stream,
            session_id,
            interaction_id: InteractionId::default(),
            owner: OwnerId::default(),
            message: message.into(),
            progress: 0,
            status: String::new(),
            files: Vec::new(),
            lora_dir: String::new(),
            error: String::new(),
            done: false,
        }
    }

    /// A progress update.
    pub fn progress(session_id: SessionId, progress: u8, status: impl Into<String>) -> Self {
        Self {
            kind: TaskResponseType::Progress,
            progress: progress.min(100),
            status: status.into(),
            ..Self::stream(session_id, "")
        }
    }

    /// A successful terminal result.
    pub fn result(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            kind: TaskResponseType::Result,
            message: message.into(),
            progress: 100,
            done: true,
            ..Self::stream(session_id, "")
        }
    }

    /// A terminal error result.
    pub fn error(session_id: SessionId, error: impl Into<String>) -> Self {
        Self {
            kind: TaskResponseType::Result,
            error: error.into(),
            done: true,
            ..Self::stream(session_id, "")
        }
    }

    /// True for the envelope that terminates its session.
    pub fn is_terminal(&self) -> bool {
        self.kind == TaskResponseType::Result
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
