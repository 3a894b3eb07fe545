// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the control plane

use herd_adapters::StoreError;
use thiserror::Error;

/// Errors that can occur in the control plane
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
