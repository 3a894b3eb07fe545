// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-local task endpoints.
//!
//! Model children long-poll `next_task` between tasks and peek
//! `initial_session` before loading fine-tune weights. The long-poll
//! parks on the instance's condition variable in short slices so shutdown
//! and instance teardown cancel promptly.

use crate::supervisor::Supervisor;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use herd_adapters::{ControlPlane, Filestore};
use herd_core::{Clock, InstanceId};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound of one long-poll round trip.
const LONG_POLL_TOTAL: Duration = Duration::from_secs(30);

/// Condition-check slice inside the long-poll.
const LONG_POLL_SLICE: Duration = Duration::from_secs(1);

struct LocalState<C: ControlPlane, F: Filestore, K: Clock> {
    supervisor: Arc<Supervisor<C, F, K>>,
}

impl<C: ControlPlane, F: Filestore, K: Clock> Clone for LocalState<C, F, K> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
        }
    }
}

/// Build the runner-local router.
pub fn router<C, F, K>(supervisor: Arc<Supervisor<C, F, K>>) -> Router
where
    C: ControlPlane,
    F: Filestore,
    K: Clock,
{
    Router::new()
        .route("/api/v1/worker/task/:instance_id", get(next_task::<C, F, K>))
        .route(
            "/api/v1/worker/initial_session/:instance_id",
            get(initial_session::<C, F, K>),
        )
        .with_state(LocalState { supervisor })
}

/// Pop: long-poll for the instance's next task.
async fn next_task<C: ControlPlane, F: Filestore, K: Clock>(
    State(state): State<LocalState<C, F, K>>,
    Path(instance_id): Path<String>,
) -> Response {
    let id = InstanceId::new(instance_id);
    let deadline = Instant::now() + LONG_POLL_TOTAL;

    loop {
        let Some(instance) = state.supervisor.instance(&id) else {
            return StatusCode::NO_CONTENT.into_response();
        };
        if instance.is_stopped() {
            return StatusCode::NO_CONTENT.into_response();
        }
        if let Some(task) = instance.pop_next_task() {
            return Json(task).into_response();
        }
        if Instant::now() >= deadline {
            return StatusCode::NO_CONTENT.into_response();
        }
        let _ = tokio::time::timeout(LONG_POLL_SLICE, instance.task_changed().notified()).await;
    }
}

/// Peek: the session the child should initialize for, without mutation.
async fn initial_session<C: ControlPlane, F: Filestore, K: Clock>(
    State(state): State<LocalState<C, F, K>>,
    Path(instance_id): Path<String>,
) -> Response {
    let id = InstanceId::new(instance_id);
    match state.supervisor.instance(&id).and_then(|i| i.peek_initial_session()) {
        Some(session) => Json(session).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
