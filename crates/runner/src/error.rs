// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the runner

use herd_adapters::{ControlPlaneError, FilestoreError, TaskError};
use thiserror::Error;

/// Errors that can occur on the runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("control plane error: {0}")]
    Control(#[from] ControlPlaneError),
    #[error("filestore error: {0}")]
    Filestore(#[from] FilestoreError),
    #[error("task error: {0}")]
    Task(#[from] TaskError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
