// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control plane as seen from a runner.
//!
//! The supervisor is generic over this trait: production uses the HTTP
//! client in `herd-runner`, tests script a [`FakeControlPlane`].

use async_trait::async_trait;
use herd_core::{InstanceId, RunnerId, RunnerState, RunnerTaskResponse, Session, SessionFilter};
use thiserror::Error;

/// Errors talking to the control plane.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Runner-side view of the control plane.
#[async_trait]
pub trait ControlPlane: Clone + Send + Sync + 'static {
    /// Ask the scheduler for one session matching `filter`.
    ///
    /// Returns `None` when nothing matched (scheduling starvation is
    /// silent by design).
    async fn poll_session(
        &self,
        runner: &RunnerId,
        filter: &SessionFilter,
    ) -> Result<Option<Session>, ControlPlaneError>;

    /// Forward one task response, attributed to the emitting instance.
    async fn post_response(
        &self,
        instance: &InstanceId,
        response: &RunnerTaskResponse,
    ) -> Result<(), ControlPlaneError>;

    /// Heartbeat the runner's current state.
    async fn post_state(&self, state: &RunnerState) -> Result<(), ControlPlaneError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeControlPlane;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted control plane for tests.
    ///
    /// Queued sessions are handed out one per poll, respecting the poll's
    /// filter so reject lists and pinned filters behave as in production.
    #[derive(Clone, Default)]
    pub struct FakeControlPlane {
        inner: Arc<Mutex<Inner>>,
    }

    #[derive(Default)]
    struct Inner {
        sessions: VecDeque<Session>,
        polls: Vec<SessionFilter>,
        responses: Vec<(InstanceId, RunnerTaskResponse)>,
        states: Vec<RunnerState>,
        fail_polls: bool,
    }

    impl FakeControlPlane {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a session to be handed to a matching poll.
        pub fn queue_session(&self, session: Session) {
            self.inner.lock().sessions.push_back(session);
        }

        /// Make subsequent polls fail with a transport error.
        pub fn set_fail_polls(&self, fail: bool) {
            self.inner.lock().fail_polls = fail;
        }

        /// Filters observed so far, in poll order.
        pub fn polls(&self) -> Vec<SessionFilter> {
            self.inner.lock().polls.clone()
        }

        /// Responses observed so far, in arrival order.
        pub fn responses(&self) -> Vec<(InstanceId, RunnerTaskResponse)> {
            self.inner.lock().responses.clone()
        }

        /// Heartbeats observed so far.
        pub fn states(&self) -> Vec<RunnerState> {
            self.inner.lock().states.clone()
        }

        /// Sessions still waiting to be handed out.
        pub fn pending(&self) -> usize {
            self.inner.lock().sessions.len()
        }
    }

    #[async_trait]
    impl ControlPlane for FakeControlPlane {
        async fn poll_session(
            &self,
            _runner: &RunnerId,
            filter: &SessionFilter,
        ) -> Result<Option<Session>, ControlPlaneError> {
            let mut inner = self.inner.lock();
            if inner.fail_polls {
                return Err(ControlPlaneError::Transport("poll failed".to_string()));
            }
            inner.polls.push(filter.clone());
            let hit = inner
                .sessions
                .iter()
                .position(|s| filter.matches(s, u64::MAX));
            Ok(hit.and_then(|i| inner.sessions.remove(i)))
        }

        async fn post_response(
            &self,
            instance: &InstanceId,
            response: &RunnerTaskResponse,
        ) -> Result<(), ControlPlaneError> {
            self.inner
                .lock()
                .responses
                .push((instance.clone(), response.clone()));
            Ok(())
        }

        async fn post_state(&self, state: &RunnerState) -> Result<(), ControlPlaneError> {
            self.inner.lock().states.push(state.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
