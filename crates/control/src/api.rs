// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-facing HTTP surface.
//!
//! The core-relevant subset: session polling, task-response ingestion and
//! runner heartbeats, plus queue/runner snapshots for the dashboard and the
//! admission route the external API fronts. Auth and the client websocket
//! transport live outside this crate.

use crate::scheduler::Scheduler;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use herd_adapters::{PushChannel, SessionStore};
use herd_core::{
    Clock, RunnerId, RunnerState, RunnerTaskResponse, Session, SessionFilter, WebsocketEvent,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state behind every handler.
pub struct ApiState<S, P, C: Clock> {
    pub scheduler: Arc<Scheduler<C>>,
    pub store: S,
    pub push: P,
}

impl<S: Clone, P: Clone, C: Clock> Clone for ApiState<S, P, C> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            store: self.store.clone(),
            push: self.push.clone(),
        }
    }
}

/// Build the worker API router.
pub fn router<S, P, C>(state: ApiState<S, P, C>) -> Router
where
    S: SessionStore,
    P: PushChannel,
    C: Clock,
{
    Router::new()
        .route("/api/v1/sessions", post(create_session::<S, P, C>))
        .route("/api/v1/worker/session", post(poll_session::<S, P, C>))
        .route(
            "/api/v1/worker/response/:instance_id",
            post(post_response::<S, P, C>),
        )
        .route("/api/v1/worker/state", post(post_state::<S, P, C>))
        .route("/api/v1/worker/queue", get(get_queue::<S, P, C>))
        .route("/api/v1/worker/runners", get(get_runners::<S, P, C>))
        .with_state(state)
}

#[derive(Deserialize)]
struct PollParams {
    runner_id: String,
}

/// Admission: store the session and enqueue it for scheduling.
///
/// Idempotent by session ID, which is also how an existing session
/// re-enters the queue when the user sends a new interaction.
async fn create_session<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
    Json(session): Json<Session>,
) -> Response {
    if let Err(err) = state.store.create_session(&session).await {
        tracing::error!(session = %session.id, error = %err, "session admission failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    state.scheduler.submit(session);
    StatusCode::OK.into_response()
}

/// One scheduling pass for a polling runner.
async fn poll_session<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
    Query(params): Query<PollParams>,
    Json(filter): Json<SessionFilter>,
) -> Response {
    let runner = RunnerId::new(params.runner_id);
    match state.scheduler.schedule(&runner, &filter) {
        Some(session) => (StatusCode::OK, Json(session)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Fold a task response into the stored session and fan it out.
///
/// Responses for unknown sessions are acknowledged and dropped: delivery
/// is at-least-once and the session may already be gone.
async fn post_response<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
    Path(instance_id): Path<String>,
    Json(response): Json<RunnerTaskResponse>,
) -> Response {
    let session = match state.store.get_session(&response.session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::warn!(
                session = %response.session_id,
                instance = %instance_id,
                "response for unknown session dropped"
            );
            return StatusCode::OK.into_response();
        }
        Err(err) => {
            tracing::error!(session = %response.session_id, error = %err, "session lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut updated = session;
    if !updated.apply_response(&response) {
        tracing::warn!(
            session = %updated.id,
            instance = %instance_id,
            "response for session with no open interaction dropped"
        );
        return StatusCode::OK.into_response();
    }
    if let Err(err) = state.store.update_session(&updated).await {
        tracing::error!(session = %updated.id, error = %err, "session update failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    state.push.broadcast(&WebsocketEvent::SessionUpdate {
        owner: updated.owner.clone(),
        session_id: updated.id.clone(),
        session: Some(updated),
        response: Some(response),
    });
    StatusCode::OK.into_response()
}

/// Runner heartbeat.
async fn post_state<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
    Json(runner_state): Json<RunnerState>,
) -> StatusCode {
    state.scheduler.heartbeat(runner_state);
    StatusCode::OK
}

/// Queue snapshot for dashboards.
async fn get_queue<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
) -> Json<Vec<Session>> {
    Json(state.scheduler.queue_snapshot())
}

/// Runner snapshot, including decision rings.
async fn get_runners<S: SessionStore, P: PushChannel, C: Clock>(
    State(state): State<ApiState<S, P, C>>,
) -> Json<Vec<RunnerState>> {
    Json(state.scheduler.runners_snapshot())
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
