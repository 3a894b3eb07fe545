// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: prefetch overlaps the running session's compute.

use crate::prelude::*;

// While S1 runs, S2's five input files download in the background; once
// S1's result lands, S2's task is available in a single pop.
#[tokio::test]
async fn next_session_files_download_while_current_runs() {
    let mut h = instance_harness();

    // S1 becomes the current session.
    h.instance.assign(session("s1").build());
    {
        let instance = h.instance.clone();
        wait_until("s1 popped", move || instance.pop_next_task().is_some()).await;
    }

    // S2 arrives with five files; downloads are parked to make the
    // overlap window observable.
    let files: Vec<String> = (0..5).map(|i| format!("sessions/s2/in-{i}.txt")).collect();
    for f in &files {
        h.filestore.put(f.clone(), format!("payload {f}").into_bytes());
    }
    h.filestore.hold_downloads();
    h.instance.assign(session("s2").files(files).build());

    // S1 still runs; S2 is not poppable (current occupied, files pending).
    assert!(h.instance.pop_next_task().is_none());

    // S1 finishes. S2 is still gated on its downloads.
    herd_runner::demux::route(
        &h.instance,
        herd_core::RunnerTaskResponse::result(herd_core::SessionId::new("s1"), "done"),
    )
    .await;
    let (_, s1_result) = h.responses.recv().await.unwrap();
    assert!(s1_result.is_terminal());
    assert!(h.instance.pop_next_task().is_none(), "files still pending");

    // Downloads complete; one pop hands over S2's task.
    h.filestore.release_downloads();
    {
        let instance = h.instance.clone();
        wait_until("s2 popped", move || instance.pop_next_task().is_some()).await;
    }
    let current = h.instance.peek_initial_session().unwrap();
    assert_eq!(current.id, herd_core::SessionId::new("s2"));

    // All five files landed in the instance workspace.
    let dir = h.workspace.path().join("sessions").join("s2");
    let mut count = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_file() {
            count += 1;
        }
    }
    assert_eq!(count, 5);
}

// A preparation failure terminates the session with an error response
// and leaves the instance serviceable.
#[tokio::test]
async fn failed_prefetch_errors_the_session_only() {
    let mut h = instance_harness();
    h.filestore.fail_download("sessions/s1/input.txt");

    h.instance
        .assign(session("s1").files(vec!["sessions/s1/input.txt".to_string()]).build());

    let (_, resp) = h.responses.recv().await.unwrap();
    assert!(resp.done);
    assert!(resp.error.contains("session preparation failed"));

    // The instance takes later work just fine.
    h.instance.assign(session("s2").build());
    {
        let instance = h.instance.clone();
        wait_until("s2 popped", move || instance.pop_next_task().is_some()).await;
    }
    assert_eq!(
        h.instance.peek_initial_session().unwrap().id,
        herd_core::SessionId::new("s2")
    );
}
