// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the text model family.
//!
//! Text model children speak JSON-per-line on stdout: each envelope is a
//! serialized task response. Anything that does not parse is treated as
//! worker log noise and skipped, so the model server can print freely
//! between envelopes.

use super::{
    base_env, task_from_latest_interaction, ChildCommand, Emit, LineBuffer, ModelAdapter,
    NullSink, ProcessConfig, StreamPair, StreamSink, TaskError,
};
use herd_core::{Model, RunnerTask, RunnerTaskResponse, Session, SessionMode};

/// Adapter shared by every text model; the model name parameterizes the
/// launch command, the wire protocol is identical.
pub struct TextModelAdapter {
    model: Model,
}

impl TextModelAdapter {
    pub const fn new(model: Model) -> Self {
        Self { model }
    }
}

impl ModelAdapter for TextModelAdapter {
    fn model(&self) -> Model {
        self.model
    }

    fn build_task(&self, session: &Session) -> Result<RunnerTask, TaskError> {
        task_from_latest_interaction(session)
    }

    fn command(&self, cfg: &ProcessConfig) -> ChildCommand {
        let mut args = vec![
            "-u".to_string(),
            "-m".to_string(),
            "herd_worker.text".to_string(),
            "--model".to_string(),
            self.model.name().to_string(),
        ];
        if cfg.mode == SessionMode::Finetune {
            args.push("--finetune".to_string());
        }
        ChildCommand {
            program: "python3".to_string(),
            args,
            env: base_env(cfg),
            cwd: cfg.workspace.clone(),
        }
    }

    fn streams(&self, _mode: SessionMode, emit: Emit) -> StreamPair {
        StreamPair {
            stdout: Box::new(JsonLineSink {
                lines: LineBuffer::new(),
                emit,
            }),
            stderr: Box::new(NullSink),
        }
    }
}

/// Parses JSON-per-line task response envelopes.
struct JsonLineSink {
    lines: LineBuffer,
    emit: Emit,
}

impl StreamSink for JsonLineSink {
    fn push(&mut self, chunk: &[u8]) {
        let emit = self.emit.as_ref();
        self.lines.push(chunk, |line| {
            let line = line.trim();
            if !line.starts_with('{') {
                return;
            }
            match serde_json::from_str::<RunnerTaskResponse>(line) {
                Ok(resp) => emit(resp),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable child envelope");
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
