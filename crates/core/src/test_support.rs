// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders for tests in this crate and downstream crates.

use crate::model::Model;
use crate::owner::OwnerId;
use crate::session::{Interaction, Session, SessionId, SessionMode};

/// Builder for [`Session`] fixtures.
///
/// Defaults: text inference on `mistral-7b-instruct`, one finished user
/// interaction ("hello") plus one open system interaction, created at
/// `created` (default 0).
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    pub fn new(id: impl Into<SessionId>) -> Self {
        let id = id.into();
        let model = Model::Mistral7bInstruct;
        Self {
            session: Session {
                id: id.clone(),
                owner: OwnerId::new(format!("owner-{}", id)),
                mode: SessionMode::Inference,
                session_type: model.session_type(),
                model,
                lora_dir: String::new(),
                priority: false,
                created: 0,
                interactions: vec![
                    Interaction::user(format!("{}-i1", id), "hello", 0),
                    Interaction::system_pending(format!("{}-i2", id), 0),
                ],
            },
        }
    }

    pub fn model(mut self, model: Model) -> Self {
        self.session.model = model;
        self.session.session_type = model.session_type();
        self
    }

    pub fn mode(mut self, mode: SessionMode) -> Self {
        self.session.mode = mode;
        self
    }

    pub fn lora_dir(mut self, lora_dir: impl Into<String>) -> Self {
        self.session.lora_dir = lora_dir.into();
        self
    }

    pub fn priority(mut self, priority: bool) -> Self {
        self.session.priority = priority;
        self
    }

    pub fn created(mut self, created_ms: u64) -> Self {
        self.session.created = created_ms;
        self
    }

    pub fn prompt(mut self, message: impl Into<String>) -> Self {
        if let Some(user) = self
            .session
            .interactions
            .iter_mut()
            .rev()
            .find(|i| i.creator == crate::session::Creator::User)
        {
            user.message = message.into();
        }
        self
    }

    pub fn files(mut self, files: Vec<String>) -> Self {
        if let Some(user) = self
            .session
            .interactions
            .iter_mut()
            .rev()
            .find(|i| i.creator == crate::session::Creator::User)
        {
            user.files = files;
        }
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

/// Shorthand for the common case.
pub fn session(id: impl Into<SessionId>) -> SessionBuilder {
    SessionBuilder::new(id)
}
