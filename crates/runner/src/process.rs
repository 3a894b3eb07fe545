// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process plumbing.
//!
//! Model children run in their own process group so the whole tree
//! (worker script plus anything it forks) dies on one signal. Stdout and
//! stderr are piped and pumped into [`StreamSink`]s by dedicated tasks.

use crate::error::RunnerError;
use herd_adapters::{ChildCommand, StreamSink};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// A spawned model child with its piped output streams.
pub struct SpawnedChild {
    pub child: Child,
    pub pid: u32,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawn a child command in its own process group.
pub fn spawn_child(cmd: &ChildCommand) -> Result<SpawnedChild, RunnerError> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .envs(cmd.env.iter().cloned())
        .current_dir(&cmd.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| RunnerError::Spawn(format!("{}: {}", cmd.program, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::Spawn("stdout not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::Spawn("stderr not piped".to_string()))?;
    let pid = child
        .id()
        .ok_or_else(|| RunnerError::Spawn("child exited before pid was read".to_string()))?;

    Ok(SpawnedChild {
        child,
        pid,
        stdout,
        stderr,
    })
}

/// Kill the child's whole process group.
///
/// The child was spawned with `process_group(0)`, so its pgid equals its
/// pid and the negative value addresses the group.
pub fn kill_group(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(err) = kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL) {
        tracing::debug!(pid, error = %err, "process group kill failed");
    }
}

/// Pump a child output stream into a sink until EOF.
pub async fn copy_stream<R>(mut reader: R, mut sink: impl StreamSink)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.push(&buf[..n]),
            Err(err) => {
                tracing::debug!(error = %err, "child stream read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
