// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the SDXL image model.
//!
//! The SDXL worker is a plain diffusers script, so its protocol is sentinel
//! markers in the text stream rather than JSON:
//!
//! ```text
//! --SESSION abc123--          announces which session output belongs to
//! --PROGRESS 40--             sampling progress, percent
//! --RESULT out/0.png,out/1.png--
//! --LORA loras/abc123--       fine-tune artifact, precedes the result
//! --ERROR cuda out of memory--
//! ```
//!
//! Everything outside markers is worker chatter and ignored.

use super::{
    base_env, task_from_latest_interaction, ChildCommand, Emit, LineBuffer, ModelAdapter,
    NullSink, ProcessConfig, StreamPair, StreamSink, TaskError,
};
use herd_core::{Model, RunnerTask, RunnerTaskResponse, Session, SessionId, SessionMode};

pub struct SdxlAdapter;

impl ModelAdapter for SdxlAdapter {
    fn model(&self) -> Model {
        Model::Sdxl
    }

    fn build_task(&self, session: &Session) -> Result<RunnerTask, TaskError> {
        task_from_latest_interaction(session)
    }

    fn command(&self, cfg: &ProcessConfig) -> ChildCommand {
        ChildCommand {
            program: "python3".to_string(),
            args: vec![
                "-u".to_string(),
                "-m".to_string(),
                "herd_worker.sdxl".to_string(),
                "--mode".to_string(),
                cfg.mode.to_string(),
            ],
            env: base_env(cfg),
            cwd: cfg.workspace.clone(),
        }
    }

    fn streams(&self, _mode: SessionMode, emit: Emit) -> StreamPair {
        StreamPair {
            stdout: Box::new(MarkerSink {
                lines: LineBuffer::new(),
                state: MarkerState::default(),
                emit,
            }),
            stderr: Box::new(NullSink),
        }
    }
}

#[derive(Default)]
struct MarkerState {
    session_id: Option<SessionId>,
    lora_dir: String,
}

/// Parses the sentinel-marker protocol.
struct MarkerSink {
    lines: LineBuffer,
    state: MarkerState,
    emit: Emit,
}

/// `--NAME payload--` markers; returns (name, payload).
fn parse_marker(line: &str) -> Option<(&str, &str)> {
    let inner = line.trim().strip_prefix("--")?.strip_suffix("--")?;
    let (name, payload) = match inner.split_once(' ') {
        Some((name, payload)) => (name, payload.trim()),
        None => (inner, ""),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some((name, payload))
}

impl MarkerState {
    fn apply(&mut self, name: &str, payload: &str, emit: &(dyn Fn(RunnerTaskResponse) + Send + Sync)) {
        if name == "SESSION" {
            self.session_id = Some(SessionId::new(payload));
            self.lora_dir.clear();
            return;
        }

        // Output before a session announcement has no owner; drop it.
        let Some(session_id) = self.session_id.clone() else {
            tracing::warn!(marker = name, "output marker before session marker");
            return;
        };

        match name {
            "PROGRESS" => {
                let progress = payload.parse::<u8>().unwrap_or(0);
                emit(RunnerTaskResponse::progress(session_id, progress, "sampling"));
            }
            "LORA" => {
                self.lora_dir = payload.to_string();
            }
            "RESULT" => {
                let mut resp = RunnerTaskResponse::result(session_id, "");
                resp.files = payload
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                resp.lora_dir = std::mem::take(&mut self.lora_dir);
                emit(resp);
                self.session_id = None;
            }
            "ERROR" => {
                emit(RunnerTaskResponse::error(session_id, payload));
                self.session_id = None;
                self.lora_dir.clear();
            }
            other => {
                tracing::debug!(marker = other, "ignoring unknown marker");
            }
        }
    }
}

impl StreamSink for MarkerSink {
    fn push(&mut self, chunk: &[u8]) {
        let state = &mut self.state;
        let emit = self.emit.as_ref();
        self.lines.push(chunk, |line| {
            if let Some((name, payload)) = parse_marker(line) {
                state.apply(name, payload, emit);
            }
        });
    }
}

#[cfg(test)]
#[path = "sdxl_tests.rs"]
mod tests;
