// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner and model-instance state envelopes.
//!
//! These are the heartbeat shapes a runner reports to the control plane
//! every tick. The control-side registry keeps the latest copy per runner
//! and expires runners that go silent.

use crate::model::Model;
use crate::session::{Session, SessionId, SessionMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

crate::define_id! {
    /// Unique identifier for a runner host.
    pub struct RunnerId;
}

crate::define_id! {
    /// Unique identifier for one model instance on a runner.
    #[derive(Default)]
    pub struct InstanceId;
}

/// Lifecycle phase of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstancePhase {
    /// Child process spawned, model still loading.
    Initializing,
    /// A current session is set.
    Running,
    /// Loaded and waiting for work.
    Idle,
    /// Child exited or was killed; waiting for the supervisor to reap.
    Stopped,
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstancePhase::Initializing => write!(f, "initializing"),
            InstancePhase::Running => write!(f, "running"),
            InstancePhase::Idle => write!(f, "idle"),
            InstancePhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Maximum prompt length carried in a session summary.
const SUMMARY_PROMPT_LEN: usize = 80;

/// Compact description of a session, for instance job history and
/// dashboard views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub model: Model,
    pub mode: SessionMode,
    /// Truncated latest user prompt.
    #[serde(default)]
    pub summary: String,
    /// Session creation time, epoch milliseconds.
    #[serde(default)]
    pub created: u64,
    /// When the session was handed to an instance, epoch milliseconds.
    #[serde(default)]
    pub scheduled: u64,
}

impl SessionSummary {
    pub fn of(session: &Session, scheduled_ms: u64) -> Self {
        let mut summary = session
            .latest_user_interaction()
            .map(|i| i.message.clone())
            .unwrap_or_default();
        if summary.len() > SUMMARY_PROMPT_LEN {
            let cut = summary
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|&i| i <= SUMMARY_PROMPT_LEN)
                .last()
                .unwrap_or(0);
            summary.truncate(cut);
            summary.push('…');
        }
        Self {
            session_id: session.id.clone(),
            model: session.model,
            mode: session.mode,
            summary,
            created: session.created,
            scheduled: scheduled_ms,
        }
    }
}

/// Heartbeat state of one model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInstanceState {
    pub id: InstanceId,
    pub model: Model,
    pub mode: SessionMode,
    #[serde(default)]
    pub lora_dir: String,
    pub phase: InstancePhase,
    /// The session this instance was created for.
    #[serde(default)]
    pub initial_session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_session: Option<SessionSummary>,
    /// Bounded ring of recently completed sessions, newest last.
    #[serde(default)]
    pub recent: Vec<SessionSummary>,
    /// Last activity, epoch milliseconds. Drives idle eviction.
    #[serde(default)]
    pub last_activity: u64,
    /// GPU memory footprint in bytes.
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub stale: bool,
}

/// Heartbeat state of one runner host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    pub id: RunnerId,
    pub total_memory: u64,
    pub free_memory: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub instances: Vec<ModelInstanceState>,
    /// Recent scheduling decision lines, control-plane filled.
    #[serde(default)]
    pub decisions: Vec<String>,
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
