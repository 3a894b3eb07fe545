// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the model child dies mid-session.

use crate::prelude::*;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

#[tokio::test]
async fn child_crash_terminates_the_running_session() {
    let mut h = instance_harness();
    h.instance.assign(session("s1").build());
    {
        let instance = h.instance.clone();
        wait_until("s1 popped", move || instance.pop_next_task().is_some()).await;
    }

    // Non-zero exit while s1 runs.
    h.instance.on_child_exit(ExitStatus::from_raw(256));

    let (_, resp) = h.responses.recv().await.unwrap();
    assert!(resp.done);
    assert!(resp.is_terminal());
    assert_eq!(resp.session_id, herd_core::SessionId::new("s1"));
    assert!(resp.error.contains("model process exited"));

    assert!(h.instance.is_stopped());
    assert!(h.instance.pop_next_task().is_none());

    // Nothing further is emitted for the crashed session.
    assert!(h.responses.try_recv().is_err());
}

#[tokio::test]
async fn clean_exit_without_session_emits_nothing() {
    let mut h = instance_harness();
    h.instance.on_child_exit(ExitStatus::from_raw(0));

    assert!(h.instance.is_stopped());
    assert!(h.responses.try_recv().is_err());
}
