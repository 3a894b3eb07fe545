// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler scenarios: warm routing, cold spawn, reject lists.

use crate::prelude::*;
use herd_core::{
    FakeClock, InstanceId, InstancePhase, Model, ModelInstanceState, ModelModePair, RunnerId,
    RunnerState, SessionFilter, SessionMode,
};

fn runner_state(instances: Vec<ModelInstanceState>) -> RunnerState {
    RunnerState {
        id: RunnerId::new("r1"),
        total_memory: 64 << 30,
        free_memory: 32 << 30,
        labels: Default::default(),
        instances,
        decisions: Vec::new(),
    }
}

fn instance_state(model: Model, mode: SessionMode, phase: InstancePhase) -> ModelInstanceState {
    ModelInstanceState {
        id: InstanceId::new("i1"),
        model,
        mode,
        lora_dir: String::new(),
        phase,
        initial_session_id: "seed".into(),
        current_session: None,
        recent: Vec::new(),
        last_activity: 0,
        memory: model.memory_bytes(mode),
        stale: false,
    }
}

// Scenario A: the warm phase routes onto the already-loaded model even
// when an older session for another model waits at the head.
#[tokio::test]
async fn warm_routing_over_queue_order() {
    let control = LocalControl::new(FakeClock::new());
    control.scheduler.submit(session("s1").created(200).build());
    control
        .scheduler
        .submit(session("s2").model(Model::Llama3_8b).created(100).build());

    control.scheduler.heartbeat(runner_state(vec![instance_state(
        Model::Mistral7bInstruct,
        SessionMode::Inference,
        InstancePhase::Idle,
    )]));

    let hit = control
        .scheduler
        .schedule(&RunnerId::new("r1"), &SessionFilter::for_capacity(48 << 30, Vec::new()))
        .unwrap();
    assert_eq!(hit.id, "s1");
    assert_eq!(control.scheduler.queue_depth(), 1);
}

// Scenario B: no warm fit; the cold phase still serves the session and
// the runner is expected to spawn for it.
#[tokio::test]
async fn cold_phase_serves_unloaded_models() {
    let control = LocalControl::new(FakeClock::new());
    control.scheduler.submit(session("s1").build());

    control.scheduler.heartbeat(runner_state(vec![instance_state(
        Model::Llama3_8b,
        SessionMode::Inference,
        InstancePhase::Idle,
    )]));

    let hit = control
        .scheduler
        .schedule(&RunnerId::new("r1"), &SessionFilter::for_capacity(48 << 30, Vec::new()))
        .unwrap();
    assert_eq!(hit.id, "s1");

    let runners = control.scheduler.runners_snapshot();
    let line = runners[0].decisions.last().unwrap();
    assert!(line.starts_with("cold match"), "got: {line}");
}

// Scenario F: every copy of the session's model is busy on the runner;
// the poll's reject list keeps the session queued with a no-match
// decision.
#[tokio::test]
async fn busy_models_are_rejected() {
    let control = LocalControl::new(FakeClock::new());
    control.scheduler.submit(session("s1").build());

    control.scheduler.heartbeat(runner_state(vec![
        instance_state(
            Model::Mistral7bInstruct,
            SessionMode::Inference,
            InstancePhase::Running,
        ),
        instance_state(
            Model::Mistral7bInstruct,
            SessionMode::Finetune,
            InstancePhase::Running,
        ),
    ]));

    let filter = SessionFilter::for_capacity(
        16 << 30,
        vec![
            ModelModePair {
                model: Model::Mistral7bInstruct,
                mode: SessionMode::Inference,
            },
            ModelModePair {
                model: Model::Mistral7bInstruct,
                mode: SessionMode::Finetune,
            },
        ],
    );
    assert!(control
        .scheduler
        .schedule(&RunnerId::new("r1"), &filter)
        .is_none());
    assert_eq!(control.scheduler.queue_depth(), 1);

    let runners = control.scheduler.runners_snapshot();
    let line = runners[0].decisions.last().unwrap();
    assert!(line.starts_with("no match"), "got: {line}");
}

// The lora sentinel semantics hold through queue and scheduler: an
// instance with no artifact serves only artifact-free sessions.
#[tokio::test]
async fn lora_sentinel_respected_through_scheduling() {
    let control = LocalControl::new(FakeClock::new());
    control
        .scheduler
        .submit(session("tuned").lora_dir("loras/custom").created(100).build());
    control.scheduler.submit(session("plain").created(200).build());

    control.scheduler.heartbeat(runner_state(vec![instance_state(
        Model::Mistral7bInstruct,
        SessionMode::Inference,
        InstancePhase::Idle,
    )]));

    // Warm phase skips the tuned session despite its age advantage.
    let hit = control
        .scheduler
        .schedule(&RunnerId::new("r1"), &SessionFilter::for_capacity(48 << 30, Vec::new()))
        .unwrap();
    assert_eq!(hit.id, "plain");
}
