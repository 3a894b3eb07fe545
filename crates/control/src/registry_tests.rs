// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::test_support::session;
use herd_core::{InstanceId, ModelInstanceState, NoMatchReason, SessionId};
use std::collections::HashMap as Map;

fn instance(id: &str, phase: InstancePhase) -> ModelInstanceState {
    ModelInstanceState {
        id: InstanceId::new(id),
        model: Model::Mistral7bInstruct,
        mode: SessionMode::Inference,
        lora_dir: String::new(),
        phase,
        initial_session_id: SessionId::new("s0"),
        current_session: None,
        recent: Vec::new(),
        last_activity: 0,
        memory: 15 << 30,
        stale: false,
    }
}

fn state(id: &str, instances: Vec<ModelInstanceState>) -> RunnerState {
    RunnerState {
        id: RunnerId::new(id),
        total_memory: 64 << 30,
        free_memory: 32 << 30,
        labels: Map::new(),
        instances,
        decisions: Vec::new(),
    }
}

#[test]
fn heartbeat_creates_then_refreshes() {
    let mut reg = RunnerRegistry::new(8);
    let now = Instant::now();

    reg.heartbeat(state("r1", vec![]), now);
    assert_eq!(reg.len(), 1);

    reg.heartbeat(state("r1", vec![instance("i1", InstancePhase::Idle)]), now);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.snapshot()[0].instances.len(), 1);
}

#[test]
fn idle_instances_filters_phase_and_staleness() {
    let mut reg = RunnerRegistry::new(8);
    let mut stale = instance("i3", InstancePhase::Idle);
    stale.stale = true;
    reg.heartbeat(
        state(
            "r1",
            vec![
                instance("i1", InstancePhase::Idle),
                instance("i2", InstancePhase::Running),
                stale,
            ],
        ),
        Instant::now(),
    );

    let idle = reg.idle_instances(&RunnerId::new("r1"));
    assert_eq!(idle.len(), 1);
    assert_eq!(idle[0].0, Model::Mistral7bInstruct);

    assert!(reg.idle_instances(&RunnerId::new("unknown")).is_empty());
}

#[test]
fn vanished_instance_is_kept_one_generation_as_stale() {
    let mut reg = RunnerRegistry::new(8);
    let now = Instant::now();
    let runner = RunnerId::new("r1");

    let i1 = instance("i1", InstancePhase::Idle);
    let i2 = instance("i2", InstancePhase::Idle);
    reg.heartbeat(state("r1", vec![i1, i2.clone()]), now);
    assert_eq!(reg.idle_instances(&runner).len(), 2);

    // i1 drops out of the next heartbeat: retained once, marked stale,
    // and excluded from warm routing.
    reg.heartbeat(state("r1", vec![i2.clone()]), now);
    let snap = reg.snapshot();
    assert_eq!(snap[0].instances.len(), 2);
    let ghost = snap[0]
        .instances
        .iter()
        .find(|i| i.id == InstanceId::new("i1"))
        .unwrap();
    assert!(ghost.stale);
    assert_eq!(reg.idle_instances(&runner).len(), 1);

    // One generation only: the ghost is gone on the following heartbeat.
    reg.heartbeat(state("r1", vec![i2]), now);
    assert_eq!(reg.snapshot()[0].instances.len(), 1);
}

#[test]
fn returning_instance_is_not_marked_stale() {
    let mut reg = RunnerRegistry::new(8);
    let now = Instant::now();
    let i1 = instance("i1", InstancePhase::Idle);

    reg.heartbeat(state("r1", vec![i1.clone()]), now);
    reg.heartbeat(state("r1", vec![i1]), now);

    let snap = reg.snapshot();
    assert_eq!(snap[0].instances.len(), 1);
    assert!(!snap[0].instances[0].stale);
}

#[test]
fn record_before_heartbeat_creates_placeholder() {
    let mut reg = RunnerRegistry::new(8);
    let now = Instant::now();
    let s = session("s1").build();
    reg.record(&RunnerId::new("r1"), SchedulingDecision::cold(&s, 0), now);

    let snap = reg.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].total_memory, 0);
    assert_eq!(snap[0].decisions.len(), 1);
}

#[test]
fn decision_ring_is_bounded() {
    let mut reg = RunnerRegistry::new(3);
    let now = Instant::now();
    let runner = RunnerId::new("r1");
    for i in 0..5 {
        reg.record(
            &runner,
            SchedulingDecision::no_match(NoMatchReason::QueueEmpty, i),
            now,
        );
    }

    let snap = reg.snapshot();
    assert_eq!(snap[0].decisions.len(), 3);
}

#[test]
fn expire_removes_only_silent_runners() {
    let mut reg = RunnerRegistry::new(8);
    let start = Instant::now();
    reg.heartbeat(state("quiet", vec![]), start);
    let later = start + Duration::from_secs(60);
    reg.heartbeat(state("chatty", vec![]), later);

    let expired = reg.expire(Duration::from_secs(30), later);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, RunnerId::new("quiet"));
    assert_eq!(reg.len(), 1);

    // Nothing else to expire
    assert!(reg.expire(Duration::from_secs(30), later).is_empty());
}

#[test]
fn decisions_survive_heartbeats() {
    let mut reg = RunnerRegistry::new(8);
    let now = Instant::now();
    let runner = RunnerId::new("r1");
    let s = session("s1").build();

    reg.heartbeat(state("r1", vec![]), now);
    reg.record(&runner, SchedulingDecision::warm(&s, 0), now);
    reg.heartbeat(state("r1", vec![]), now);

    assert_eq!(reg.snapshot()[0].decisions.len(), 1);
}
