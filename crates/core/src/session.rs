// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessions and interactions.
//!
//! A session is a conversational thread bound to one model and mode. The
//! pending copy is owned by the control plane's queue; once scheduled, the
//! model instance owns a working copy until the session terminates. A
//! session may be admitted again when the external API appends a new user
//! interaction.

use crate::model::Model;
use crate::owner::OwnerId;
use crate::task::RunnerTaskResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

crate::define_id! {
    /// Unique identifier for a session.
    #[derive(Default)]
    pub struct SessionId;
}

crate::define_id! {
    /// Unique identifier for one interaction within a session.
    #[derive(Default)]
    pub struct InteractionId;
}

/// Sentinel `lora_dir` value meaning "explicitly no fine-tune artifact".
///
/// Distinct from the empty string, which means "unspecified". The two are
/// never normalized into each other; only the scheduler-side filter
/// interprets the empty string as a wildcard. Both forms must survive
/// serialization bit-for-bit.
pub const LORA_DIR_NONE: &str = "none";

/// Execution mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Inference,
    Finetune,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Inference => write!(f, "inference"),
            SessionMode::Finetune => write!(f, "finetune"),
        }
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inference" => Ok(SessionMode::Inference),
            "finetune" => Ok(SessionMode::Finetune),
            other => Err(format!("unknown session mode: {other}")),
        }
    }
}

/// Payload type of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Text,
    Image,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Text => write!(f, "text"),
            SessionType::Image => write!(f, "image"),
        }
    }
}

/// Who authored an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creator {
    User,
    System,
}

/// Lifecycle state of one interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    #[default]
    Waiting,
    Editing,
    Complete,
    Error,
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionState::Waiting => write!(f, "waiting"),
            InteractionState::Editing => write!(f, "editing"),
            InteractionState::Complete => write!(f, "complete"),
            InteractionState::Error => write!(f, "error"),
        }
    }
}

/// One message within a session.
///
/// Invariant: the final system interaction is the one the active task is
/// filling in; every prior interaction is `complete` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub creator: Creator,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// 0 to 100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub state: InteractionState,
    #[serde(default)]
    pub error: String,
    /// Set when this interaction produced a fine-tune artifact.
    #[serde(default)]
    pub lora_dir: String,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub created: u64,
}

impl Interaction {
    pub fn user(id: impl Into<InteractionId>, message: impl Into<String>, created: u64) -> Self {
        Self {
            id: id.into(),
            creator: Creator::User,
            message: message.into(),
            files: Vec::new(),
            progress: 0,
            finished: true,
            state: InteractionState::Complete,
            error: String::new(),
            lora_dir: String::new(),
            created,
        }
    }

    pub fn system_pending(id: impl Into<InteractionId>, created: u64) -> Self {
        Self {
            id: id.into(),
            creator: Creator::System,
            message: String::new(),
            files: Vec::new(),
            progress: 0,
            finished: false,
            state: InteractionState::Waiting,
            error: String::new(),
            lora_dir: String::new(),
            created,
        }
    }
}

/// A conversational thread bound to one model and mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner: OwnerId,
    pub mode: SessionMode,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub model: Model,
    /// Fine-tune artifact path; empty = unspecified, [`LORA_DIR_NONE`] =
    /// explicitly none.
    #[serde(default)]
    pub lora_dir: String,
    #[serde(default)]
    pub priority: bool,
    /// Creation time, milliseconds since the Unix epoch.
    pub created: u64,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Session {
    /// The most recent user interaction; its message and files become the
    /// next runner task.
    pub fn latest_user_interaction(&self) -> Option<&Interaction> {
        self.interactions
            .iter()
            .rev()
            .find(|i| i.creator == Creator::User)
    }

    /// The trailing system interaction the active task is filling in.
    ///
    /// Returns `None` when the session has no open system turn, i.e. the
    /// last interaction is from the user or already finished.
    pub fn working_system_interaction(&self) -> Option<&Interaction> {
        match self.interactions.last() {
            Some(i) if i.creator == Creator::System && !i.finished => Some(i),
            _ => None,
        }
    }

    fn working_system_interaction_mut(&mut self) -> Option<&mut Interaction> {
        match self.interactions.last_mut() {
            Some(i) if i.creator == Creator::System && !i.finished => Some(i),
            _ => None,
        }
    }

    /// GPU footprint this session needs, from the model registry.
    pub fn memory_bytes(&self) -> u64 {
        self.model.memory_bytes(self.mode)
    }

    /// Age of the session at `now_ms`.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created)
    }

    /// Fold a task response into the open system interaction.
    ///
    /// `stream` appends a message chunk, `progress` updates progress and
    /// status, `result` finalizes the interaction (complete or error) and
    /// records produced files and any fine-tune artifact. Returns false
    /// when the session has no open system interaction to fill.
    pub fn apply_response(&mut self, resp: &RunnerTaskResponse) -> bool {
        use crate::task::TaskResponseType;

        let Some(interaction) = self.working_system_interaction_mut() else {
            return false;
        };

        match resp.kind {
            TaskResponseType::Stream => {
                interaction.state = InteractionState::Editing;
                interaction.message.push_str(&resp.message);
            }
            TaskResponseType::Progress => {
                interaction.state = InteractionState::Editing;
                interaction.progress = resp.progress.min(100);
            }
            TaskResponseType::Result => {
                if !resp.message.is_empty() {
                    interaction.message = resp.message.clone();
                }
                interaction.files = resp.files.clone();
                interaction.lora_dir = resp.lora_dir.clone();
                interaction.progress = 100;
                interaction.finished = true;
                if resp.error.is_empty() {
                    interaction.state = InteractionState::Complete;
                } else {
                    interaction.state = InteractionState::Error;
                    interaction.error = resp.error.clone();
                }
            }
        }
        true
    }

    /// Mark the open system interaction errored without a task response.
    ///
    /// Used when the runner holding this session disappears.
    pub fn mark_errored(&mut self, error: impl Into<String>) -> bool {
        let Some(interaction) = self.working_system_interaction_mut() else {
            return false;
        };
        interaction.finished = true;
        interaction.state = InteractionState::Error;
        interaction.error = error.into();
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
