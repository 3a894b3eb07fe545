// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler-level tests; the HTTP plumbing itself is axum's concern.

use super::*;
use crate::scheduler::SchedulerConfig;
use herd_adapters::{FakePush, MemorySessionStore};
use herd_core::test_support::session;
use herd_core::{FakeClock, InteractionState, RunnerTaskResponse};

type TestState = ApiState<MemorySessionStore, FakePush, FakeClock>;

fn state() -> TestState {
    ApiState {
        scheduler: Arc::new(Scheduler::new(SchedulerConfig::default(), FakeClock::new())),
        store: MemorySessionStore::new(),
        push: FakePush::new(),
    }
}

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_then_poll_round_trips_a_session() {
    let st = state();

    let resp = create_session(
        State(st.clone()),
        Json(session("s1").build()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = poll_session(
        State(st.clone()),
        Query(PollParams {
            runner_id: "r1".to_string(),
        }),
        Json(SessionFilter::default()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["id"], "s1");

    // Queue drained; next poll is empty
    let resp = poll_session(
        State(st),
        Query(PollParams {
            runner_id: "r1".to_string(),
        }),
        Json(SessionFilter::default()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn response_updates_store_and_fans_out() {
    let st = state();
    st.store
        .create_session(&session("s1").build())
        .await
        .unwrap();

    let resp = post_response(
        State(st.clone()),
        Path("i1".to_string()),
        Json(RunnerTaskResponse::stream("s1".into(), "Hel")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_response(
        State(st.clone()),
        Path("i1".to_string()),
        Json(RunnerTaskResponse::result("s1".into(), "Hello")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = st
        .store
        .get_session(&"s1".into())
        .await
        .unwrap()
        .unwrap();
    let tail = stored.interactions.last().unwrap();
    assert_eq!(tail.message, "Hello");
    assert_eq!(tail.state, InteractionState::Complete);

    let events = st.push.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].session_id(), &herd_core::SessionId::new("s1"));
}

#[tokio::test]
async fn response_for_unknown_session_is_acknowledged_and_dropped() {
    let st = state();
    let resp = post_response(
        State(st.clone()),
        Path("i1".to_string()),
        Json(RunnerTaskResponse::stream("ghost".into(), "x")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(st.push.events().is_empty());
}

#[tokio::test]
async fn response_after_terminal_is_dropped() {
    let st = state();
    st.store
        .create_session(&session("s1").build())
        .await
        .unwrap();

    post_response(
        State(st.clone()),
        Path("i1".to_string()),
        Json(RunnerTaskResponse::result("s1".into(), "done")),
    )
    .await;
    let resp = post_response(
        State(st.clone()),
        Path("i1".to_string()),
        Json(RunnerTaskResponse::stream("s1".into(), "late")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Only the terminal response fanned out
    assert_eq!(st.push.events().len(), 1);
}

#[tokio::test]
async fn heartbeat_then_snapshot() {
    let st = state();
    let code = post_state(
        State(st.clone()),
        Json(RunnerState {
            id: RunnerId::new("r1"),
            total_memory: 64 << 30,
            free_memory: 64 << 30,
            labels: Default::default(),
            instances: Vec::new(),
            decisions: Vec::new(),
        }),
    )
    .await;
    assert_eq!(code, StatusCode::OK);

    let Json(runners) = get_runners(State(st.clone())).await;
    assert_eq!(runners.len(), 1);
    assert_eq!(runners[0].id, RunnerId::new("r1"));

    let Json(queue) = get_queue(State(st)).await;
    assert!(queue.is_empty());
}
