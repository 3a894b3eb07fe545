// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-model adapters.
//!
//! Every model the fleet hosts differs in three ways: the command that
//! launches its child process, how a session translates into a runner
//! task, and how its stdout frames task responses. [`ModelAdapter`]
//! captures exactly that capability set; [`adapter_for`] dispatches over
//! the closed model registry, so adding a model means adding an arm here
//! and nothing else.

mod lines;
mod sdxl;
mod text;

pub use lines::LineBuffer;
pub use sdxl::SdxlAdapter;
pub use text::TextModelAdapter;

use herd_core::{
    InstanceId, Model, RunnerTask, RunnerTaskResponse, Session, SessionId, SessionMode,
    LORA_DIR_NONE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors translating a session into a runner task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("session {0} has no user interaction")]
    NoUserInteraction(SessionId),
}

/// Everything an adapter needs to build the child process command.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub instance_id: InstanceId,
    /// Instance-private workspace directory.
    pub workspace: PathBuf,
    /// Pop endpoint the child long-polls for its next task.
    pub next_task_url: String,
    /// Peek endpoint the child reads before loading fine-tune weights.
    pub initial_session_url: String,
    pub mode: SessionMode,
    pub lora_dir: String,
}

/// A fully-resolved child process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

/// Callback the stream parsers emit decoded responses through.
pub type Emit = Arc<dyn Fn(RunnerTaskResponse) + Send + Sync>;

/// Consumer of one child output stream.
pub trait StreamSink: Send {
    fn push(&mut self, chunk: &[u8]);
}

/// Sink that discards its stream.
pub struct NullSink;

impl StreamSink for NullSink {
    fn push(&mut self, _chunk: &[u8]) {}
}

/// Model-specific parsers for a child's stdout and stderr.
pub struct StreamPair {
    pub stdout: Box<dyn StreamSink>,
    pub stderr: Box<dyn StreamSink>,
}

/// The capability set one hosted model provides.
pub trait ModelAdapter: Send + Sync {
    fn model(&self) -> Model;

    /// GPU footprint of one loaded instance.
    fn memory_bytes(&self, mode: SessionMode) -> u64 {
        self.model().memory_bytes(mode)
    }

    /// Translate the session's latest user interaction into a task.
    ///
    /// File and lora paths in the session are expected to already point at
    /// local, prefetched copies; translation never touches the filestore.
    fn build_task(&self, session: &Session) -> Result<RunnerTask, TaskError>;

    /// The command that launches this model's child process.
    fn command(&self, cfg: &ProcessConfig) -> ChildCommand;

    /// Stream parsers for this model's stdout framing.
    fn streams(&self, mode: SessionMode, emit: Emit) -> StreamPair;
}

/// Adapter for a model from the closed registry.
pub fn adapter_for(model: Model) -> &'static dyn ModelAdapter {
    static MISTRAL: TextModelAdapter = TextModelAdapter::new(Model::Mistral7bInstruct);
    static LLAMA3: TextModelAdapter = TextModelAdapter::new(Model::Llama3_8b);
    static SDXL: SdxlAdapter = SdxlAdapter;

    match model {
        Model::Mistral7bInstruct => &MISTRAL,
        Model::Llama3_8b => &LLAMA3,
        Model::Sdxl => &SDXL,
    }
}

/// Shared session-to-task translation: prompt and paths come from the
/// latest user interaction, the dataset directory is where prefetch put the
/// training files.
pub(crate) fn task_from_latest_interaction(session: &Session) -> Result<RunnerTask, TaskError> {
    let user = session
        .latest_user_interaction()
        .ok_or_else(|| TaskError::NoUserInteraction(session.id.clone()))?;

    let lora_dir = if session.lora_dir == LORA_DIR_NONE {
        String::new()
    } else {
        session.lora_dir.clone()
    };

    let dataset_dir = if session.mode == SessionMode::Finetune {
        user.files
            .first()
            .and_then(|f| Path::new(f).parent())
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    } else {
        String::new()
    };

    Ok(RunnerTask {
        session_id: session.id.clone(),
        prompt: user.message.clone(),
        lora_dir,
        dataset_dir,
    })
}

/// Environment shared by every model child process.
pub(crate) fn base_env(cfg: &ProcessConfig) -> Vec<(String, String)> {
    vec![
        ("HERD_INSTANCE_ID".to_string(), cfg.instance_id.to_string()),
        ("HERD_NEXT_TASK_URL".to_string(), cfg.next_task_url.clone()),
        (
            "HERD_INITIAL_SESSION_URL".to_string(),
            cfg.initial_session_url.clone(),
        ),
        ("HERD_MODE".to_string(), cfg.mode.to_string()),
        ("HERD_LORA_DIR".to_string(), cfg.lora_dir.clone()),
    ]
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
