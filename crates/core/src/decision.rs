// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling decisions, one per runner poll.
//!
//! Every poll produces exactly one decision: a warm match against an
//! already-loaded instance, a cold match requiring a fresh instance, or a
//! miss with a reason. Decisions land in the runner's bounded ring for the
//! dashboard; they carry no behavior.

use crate::model::Model;
use crate::session::{Session, SessionId, SessionMode};
use crate::time_fmt::format_elapsed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    WarmMatch,
    ColdMatch,
    NoMatch,
}

/// Why a poll returned nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    QueueEmpty,
    NoFit,
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatchReason::QueueEmpty => write!(f, "queue empty"),
            NoMatchReason::NoFit => write!(f, "no matching session"),
        }
    }
}

/// One scheduling decision, recorded on the runner's decision ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingDecision {
    /// When the decision was made, epoch milliseconds.
    pub at: u64,
    pub kind: DecisionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoMatchReason>,
    /// How long the matched session had been queued, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waited_ms: Option<u64>,
}

impl SchedulingDecision {
    pub fn warm(session: &Session, now_ms: u64) -> Self {
        Self::matched(DecisionKind::WarmMatch, session, now_ms)
    }

    pub fn cold(session: &Session, now_ms: u64) -> Self {
        Self::matched(DecisionKind::ColdMatch, session, now_ms)
    }

    pub fn no_match(reason: NoMatchReason, now_ms: u64) -> Self {
        Self {
            at: now_ms,
            kind: DecisionKind::NoMatch,
            session_id: None,
            model: None,
            mode: None,
            reason: Some(reason),
            waited_ms: None,
        }
    }

    fn matched(kind: DecisionKind, session: &Session, now_ms: u64) -> Self {
        Self {
            at: now_ms,
            kind,
            session_id: Some(session.id.clone()),
            model: Some(session.model),
            mode: Some(session.mode),
            reason: None,
            waited_ms: Some(session.age_ms(now_ms)),
        }
    }

    /// True when this decision handed out a session.
    pub fn is_match(&self) -> bool {
        self.kind != DecisionKind::NoMatch
    }
}

impl fmt::Display for SchedulingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DecisionKind::NoMatch => match self.reason {
                Some(reason) => write!(f, "no match: {}", reason),
                None => write!(f, "no match"),
            },
            kind => {
                let label = match kind {
                    DecisionKind::WarmMatch => "warm match",
                    _ => "cold match",
                };
                write!(f, "{}:", label)?;
                if let Some(id) = &self.session_id {
                    write!(f, " session {}", id.short(8))?;
                }
                if let (Some(model), Some(mode)) = (self.model, self.mode) {
                    write!(f, " ({}/{}", model, mode)?;
                    if let Some(waited) = self.waited_ms {
                        write!(f, ", waited {}", format_elapsed(waited))?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
