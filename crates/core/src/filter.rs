// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session filter: the constraint set a runner poll carries.

use crate::model::Model;
use crate::session::{Session, SessionMode, SessionType, LORA_DIR_NONE};
use serde::{Deserialize, Serialize};

/// A (model, mode) pair a runner refuses to accept another copy of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelModePair {
    pub model: Model,
    pub mode: SessionMode,
}

/// Constraints a runner poll places on session selection.
///
/// Unset optional fields match anything. `lora_dir` keeps string
/// semantics because the empty string and the [`LORA_DIR_NONE`] sentinel
/// mean different things and must cross the wire unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub session_type: Option<SessionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    /// Empty = any; [`LORA_DIR_NONE`] = sessions with no artifact;
    /// otherwise exact match.
    #[serde(default)]
    pub lora_dir: String,
    /// Maximum memory footprint in bytes. Zero means unconstrained
    /// (used by warm filters pinned to an already-loaded instance).
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub reject: Vec<ModelModePair>,
    /// Minimum session age in milliseconds.
    #[serde(default)]
    pub older_ms: u64,
}

impl SessionFilter {
    /// Broad filter for a cold poll: anything fitting in `memory` except
    /// the rejected (model, mode) pairs.
    pub fn for_capacity(memory: u64, reject: Vec<ModelModePair>) -> Self {
        Self {
            memory,
            reject,
            ..Self::default()
        }
    }

    /// Narrow filter pinned to an already-loaded instance.
    pub fn for_instance(model: Model, mode: SessionMode, lora_dir: impl Into<String>) -> Self {
        let mut lora_dir = lora_dir.into();
        // An instance loaded without an artifact serves exactly the
        // sessions that carry none.
        if lora_dir.is_empty() {
            lora_dir = LORA_DIR_NONE.to_string();
        }
        Self {
            mode: Some(mode),
            session_type: Some(model.session_type()),
            model: Some(model),
            lora_dir,
            ..Self::default()
        }
    }

    /// The lora rule: empty filter matches anything; the sentinel matches
    /// sessions whose own `lora_dir` is empty or the sentinel; any other
    /// value matches exactly.
    pub fn lora_dir_matches(filter: &str, session: &str) -> bool {
        if filter.is_empty() {
            true
        } else if filter == LORA_DIR_NONE {
            session.is_empty() || session == LORA_DIR_NONE
        } else {
            filter == session
        }
    }

    /// Whether `session` satisfies every constraint at `now_ms`.
    pub fn matches(&self, session: &Session, now_ms: u64) -> bool {
        if self.mode.is_some_and(|m| m != session.mode) {
            return false;
        }
        if self.session_type.is_some_and(|t| t != session.session_type) {
            return false;
        }
        if self.model.is_some_and(|m| m != session.model) {
            return false;
        }
        if !Self::lora_dir_matches(&self.lora_dir, &session.lora_dir) {
            return false;
        }
        if self.memory > 0 && session.memory_bytes() > self.memory {
            return false;
        }
        if self.reject.iter().any(|pair| {
            pair.model == session.model && pair.mode == session.mode
        }) {
            return false;
        }
        if session.age_ms(now_ms) < self.older_ms {
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
