// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-loop specs: scheduler and supervisor wired together in process.

use crate::prelude::*;
use herd_adapters::ControlPlane;
use herd_core::{FakeClock, RunnerId, SessionId};
use herd_runner::{Supervisor, SupervisorConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn supervisor_over(
    control: &LocalControl,
    clock: &FakeClock,
    workspace: &tempfile::TempDir,
) -> Arc<Supervisor<LocalControl, herd_adapters::FakeFilestore, FakeClock>> {
    Supervisor::new(
        SupervisorConfig {
            runner_id: RunnerId::new("r1"),
            total_memory: 64 << 30,
            poll_period: Duration::from_millis(20),
            instance_ttl: Duration::from_secs(300),
            workspace: workspace.path().to_path_buf(),
            local_base_url: "http://127.0.0.1:0".to_string(),
            labels: HashMap::new(),
        },
        control.clone(),
        herd_adapters::FakeFilestore::new(),
        clock.clone(),
    )
}

// A submitted session is matched cold, the supervisor spawns for it, and
// exactly one terminal response comes back, however the child fares in
// this environment (the worker module does not exist here, so the child
// fails fast). The instance is reaped afterwards.
#[tokio::test]
async fn cold_session_terminates_with_exactly_one_result() {
    let clock = FakeClock::new();
    let control = LocalControl::new(clock.clone());
    let workspace = tempfile::tempdir().unwrap();
    let supervisor = supervisor_over(&control, &clock, &workspace);

    control.scheduler.submit(session("s1").build());

    supervisor.tick().await;
    assert_eq!(control.scheduler.queue_depth(), 0, "session left the queue");

    // The scheduler recorded a cold match for this runner.
    let runners = control.scheduler.runners_snapshot();
    assert!(runners[0]
        .decisions
        .iter()
        .any(|d| d.starts_with("cold match")));

    // Exactly one terminal response for s1, eventually.
    {
        let control = control.clone();
        wait_until("terminal response for s1", move || {
            control
                .responses_for(&SessionId::new("s1"))
                .iter()
                .any(|r| r.is_terminal())
        })
        .await;
    }

    // Keep ticking until the dead instance is reaped.
    for _ in 0..200 {
        supervisor.tick().await;
        if supervisor.instance_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(supervisor.instance_count(), 0);

    let terminals: Vec<_> = control
        .responses_for(&SessionId::new("s1"))
        .into_iter()
        .filter(|r| r.is_terminal())
        .collect();
    assert_eq!(terminals.len(), 1, "exactly one terminal response");
    assert!(terminals[0].done);
}

// Two runners polling the same scheduler never receive the same session.
#[tokio::test]
async fn competing_runners_get_disjoint_sessions() {
    let clock = FakeClock::new();
    let control = LocalControl::new(clock.clone());
    for i in 0..20 {
        control
            .scheduler
            .submit(session(&format!("s{i}")).created(i).build());
    }

    let mut tasks = Vec::new();
    for r in 0..2 {
        let control = control.clone();
        tasks.push(tokio::spawn(async move {
            let runner = RunnerId::new(format!("r{r}"));
            let filter = herd_core::SessionFilter::for_capacity(64 << 30, Vec::new());
            let mut granted = Vec::new();
            loop {
                match control.poll_session(&runner, &filter).await.unwrap() {
                    Some(s) => granted.push(s.id),
                    None => break granted,
                }
            }
        }));
    }

    let mut all = Vec::new();
    for t in tasks {
        all.extend(t.await.unwrap());
    }
    let unique: std::collections::HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), 20);
    assert_eq!(unique.len(), 20);
}
