// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of models the fleet knows how to host.
//!
//! Memory requirements are a static table keyed by (model, mode). Finetune
//! footprints are larger than inference because optimizer state and the
//! training batch live alongside the weights.

use crate::session::{SessionMode, SessionType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const GIB: u64 = 1024 * 1024 * 1024;

/// A model the fleet can load. Closed set; scheduling and per-model
/// adapters both match exhaustively on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[serde(rename = "mistral-7b-instruct")]
    Mistral7bInstruct,
    #[serde(rename = "llama3-8b")]
    Llama3_8b,
    #[serde(rename = "sdxl")]
    Sdxl,
}

/// Error parsing a model name off the wire.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown model: {0}")]
pub struct ParseModelError(pub String);

impl Model {
    /// Every model in the registry, in a fixed order.
    pub const ALL: [Model; 3] = [Model::Mistral7bInstruct, Model::Llama3_8b, Model::Sdxl];

    /// Wire name of the model.
    pub fn name(&self) -> &'static str {
        match self {
            Model::Mistral7bInstruct => "mistral-7b-instruct",
            Model::Llama3_8b => "llama3-8b",
            Model::Sdxl => "sdxl",
        }
    }

    /// The session type this model serves.
    pub fn session_type(&self) -> SessionType {
        match self {
            Model::Mistral7bInstruct | Model::Llama3_8b => SessionType::Text,
            Model::Sdxl => SessionType::Image,
        }
    }

    /// GPU memory footprint of one loaded instance, by mode.
    pub fn memory_bytes(&self, mode: SessionMode) -> u64 {
        match (self, mode) {
            (Model::Mistral7bInstruct, SessionMode::Inference) => 15 * GIB,
            (Model::Mistral7bInstruct, SessionMode::Finetune) => 24 * GIB,
            (Model::Llama3_8b, SessionMode::Inference) => 19 * GIB,
            (Model::Llama3_8b, SessionMode::Finetune) => 28 * GIB,
            (Model::Sdxl, SessionMode::Inference) => 15 * GIB,
            (Model::Sdxl, SessionMode::Finetune) => 24 * GIB,
        }
    }

    /// Smallest footprint over every (model, mode) pair.
    ///
    /// The supervisor skips polling entirely when free memory is below
    /// this; nothing in the queue could possibly fit.
    pub fn lowest_memory_bytes() -> u64 {
        let mut lowest = u64::MAX;
        for model in Model::ALL {
            for mode in [SessionMode::Inference, SessionMode::Finetune] {
                lowest = lowest.min(model.memory_bytes(mode));
            }
        }
        lowest
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Model {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mistral-7b-instruct" => Ok(Model::Mistral7bInstruct),
            "llama3-8b" => Ok(Model::Llama3_8b),
            "sdxl" => Ok(Model::Sdxl),
            other => Err(ParseModelError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
