// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A model instance: one child process, one loaded model, sessions run
//! serially with prefetch overlap.
//!
//! The instance holds up to three session slots:
//!
//! - `current`: the session the child is executing. Set by the task pop,
//!   cleared on the terminal response.
//! - `next`: fully prepared, files on local disk, awaiting the child's
//!   next long-poll.
//! - `queued`: assigned by the supervisor, files still downloading. At
//!   most one; a newer assignment replaces it.
//!
//! Invariants: `current` and `next` are distinct sessions; `queued` is
//! never also `next`. All three live under one mutex; the prefetch task
//! re-checks the queued slot before promoting so a replaced assignment
//! cannot leak in.

use crate::error::RunnerError;
use crate::process;
use crate::tee::{ConsoleSink, SharedTail, TeeSink};
use herd_adapters::{adapter_for, Emit, Filestore, ProcessConfig};
use herd_core::{
    Clock, Creator, InstanceId, InstancePhase, Model, ModelInstanceState, RunnerTask,
    RunnerTaskResponse, Session, SessionId, SessionMode, SessionSummary, LORA_DIR_NONE,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Channel the instance emits attributed task responses into.
pub type ResponseTx = mpsc::UnboundedSender<(InstanceId, RunnerTaskResponse)>;

/// Bytes of stderr retained for crash diagnostics.
const STDERR_TAIL_BYTES: usize = 10 * 1024;

/// Completed-session summaries kept per instance.
const RECENT_RING: usize = 8;

/// Static shape of one instance.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub id: InstanceId,
    pub model: Model,
    pub mode: SessionMode,
    /// Artifact the instance was created for; pins warm routing.
    pub lora_dir: String,
    /// Instance-private workspace directory.
    pub workspace: PathBuf,
    /// Base URL of the runner-local endpoint server.
    pub local_base_url: String,
}

struct Slots {
    phase: InstancePhase,
    current: Option<Session>,
    current_scheduled_ms: u64,
    next: Option<Session>,
    queued: Option<Session>,
    last_activity: std::time::Instant,
    last_activity_ms: u64,
    recent: VecDeque<SessionSummary>,
}

/// One child process hosting one loaded model.
pub struct ModelInstance<F: Filestore, K: Clock> {
    cfg: InstanceConfig,
    memory: u64,
    initial_session_id: SessionId,
    filestore: F,
    clock: K,
    slots: Mutex<Slots>,
    /// Wakes the child's long-poll when `next` lands or `current` clears.
    task_notify: Notify,
    /// Wakes the supervisor on terminal transitions.
    supervisor_wake: Arc<Notify>,
    responses: ResponseTx,
    stderr_tail: SharedTail,
    child_pid: Mutex<Option<u32>>,
}

impl<F: Filestore, K: Clock> ModelInstance<F, K> {
    pub fn new(
        cfg: InstanceConfig,
        initial_session_id: SessionId,
        filestore: F,
        clock: K,
        responses: ResponseTx,
        supervisor_wake: Arc<Notify>,
    ) -> Arc<Self> {
        let now = clock.now();
        let now_ms = clock.epoch_ms();
        let memory = cfg.model.memory_bytes(cfg.mode);
        Arc::new(Self {
            cfg,
            memory,
            initial_session_id,
            filestore,
            clock,
            slots: Mutex::new(Slots {
                phase: InstancePhase::Initializing,
                current: None,
                current_scheduled_ms: 0,
                next: None,
                queued: None,
                last_activity: now,
                last_activity_ms: now_ms,
                recent: VecDeque::new(),
            }),
            task_notify: Notify::new(),
            supervisor_wake,
            responses,
            stderr_tail: SharedTail::new(STDERR_TAIL_BYTES),
            child_pid: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &InstanceId {
        &self.cfg.id
    }

    pub fn model(&self) -> Model {
        self.cfg.model
    }

    pub fn mode(&self) -> SessionMode {
        self.cfg.mode
    }

    pub fn lora_dir(&self) -> &str {
        &self.cfg.lora_dir
    }

    /// GPU footprint this instance accounts for.
    pub fn memory_bytes(&self) -> u64 {
        self.memory
    }

    pub fn phase(&self) -> InstancePhase {
        self.slots.lock().phase
    }

    pub fn is_stopped(&self) -> bool {
        self.phase() == InstancePhase::Stopped
    }

    /// Loaded, no session in any slot.
    pub fn is_idle(&self) -> bool {
        let slots = self.slots.lock();
        slots.phase == InstancePhase::Idle
            && slots.current.is_none()
            && slots.next.is_none()
            && slots.queued.is_none()
    }

    pub fn last_activity(&self) -> std::time::Instant {
        self.slots.lock().last_activity
    }

    /// Whether this instance can run `session` without a new spawn.
    pub fn serves(&self, session: &Session) -> bool {
        use herd_core::SessionFilter;
        SessionFilter::for_instance(self.cfg.model, self.cfg.mode, self.cfg.lora_dir.clone())
            .matches(session, u64::MAX)
    }

    /// Wait handle for the child's long-poll.
    pub fn task_changed(&self) -> &Notify {
        &self.task_notify
    }

    /// Launch the child process and hand it the initial session.
    pub fn start(self: &Arc<Self>, initial: Session) -> Result<(), RunnerError> {
        std::fs::create_dir_all(&self.cfg.workspace)?;
        self.assign(initial);

        let adapter = adapter_for(self.cfg.model);
        let command = adapter.command(&ProcessConfig {
            instance_id: self.cfg.id.clone(),
            workspace: self.cfg.workspace.clone(),
            next_task_url: format!(
                "{}/api/v1/worker/task/{}",
                self.cfg.local_base_url, self.cfg.id
            ),
            initial_session_url: format!(
                "{}/api/v1/worker/initial_session/{}",
                self.cfg.local_base_url, self.cfg.id
            ),
            mode: self.cfg.mode,
            lora_dir: self.cfg.lora_dir.clone(),
        });

        tracing::info!(
            instance = %self.cfg.id,
            model = %self.cfg.model,
            mode = %self.cfg.mode,
            program = %command.program,
            "starting model instance"
        );

        let spawned = process::spawn_child(&command)?;
        *self.child_pid.lock() = Some(spawned.pid);

        // Raw parser output feeds the demux task, which owns routing.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let emit: Emit = Arc::new(move |resp| {
            let _ = raw_tx.send(resp);
        });
        let streams = adapter.streams(self.cfg.mode, emit);

        tokio::spawn(crate::demux::run(Arc::clone(self), raw_rx));

        let stdout_tee = TeeSink::new(vec![
            Box::new(ConsoleSink::new(self.cfg.id.clone(), "stdout")),
            streams.stdout,
        ]);
        tokio::spawn(process::copy_stream(spawned.stdout, stdout_tee));

        let stderr_tee = TeeSink::new(vec![
            Box::new(ConsoleSink::new(self.cfg.id.clone(), "stderr")),
            Box::new(self.stderr_tail.clone()),
            streams.stderr,
        ]);
        tokio::spawn(process::copy_stream(spawned.stderr, stderr_tee));

        let instance = Arc::clone(self);
        let mut child = spawned.child;
        tokio::spawn(async move {
            use std::os::unix::process::ExitStatusExt;
            match child.wait().await {
                Ok(status) => instance.on_child_exit(status),
                Err(err) => {
                    tracing::error!(instance = %instance.cfg.id, error = %err, "child wait failed");
                    instance.on_child_exit(ExitStatus::from_raw(1));
                }
            }
        });

        Ok(())
    }

    /// Accept a session from the supervisor.
    ///
    /// Stores it as `queued`, clears `next`, and prefetches its files in
    /// the background; on success the session is promoted to `next` and
    /// the child's long-poll wakes.
    pub fn assign(self: &Arc<Self>, session: Session) {
        tracing::debug!(instance = %self.cfg.id, session = %session.id, "session assigned");
        {
            let mut slots = self.slots.lock();
            slots.queued = Some(session.clone());
            slots.next = None;
            touch(&mut slots, &self.clock);
        }

        let instance = Arc::clone(self);
        tokio::spawn(async move {
            let session_id = session.id.clone();
            match instance.prefetch(session).await {
                Ok(prepared) => {
                    let promoted = {
                        let mut slots = instance.slots.lock();
                        let still_queued = slots
                            .queued
                            .as_ref()
                            .is_some_and(|q| q.id == prepared.id);
                        if still_queued {
                            slots.queued = None;
                            slots.next = Some(prepared);
                            touch(&mut slots, &instance.clock);
                        }
                        still_queued
                    };
                    if promoted {
                        instance.task_notify.notify_waiters();
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        instance = %instance.cfg.id,
                        session = %session_id,
                        error = %err,
                        "session preparation failed"
                    );
                    let orphaned = {
                        let mut slots = instance.slots.lock();
                        let still_queued = slots
                            .queued
                            .as_ref()
                            .is_some_and(|q| q.id == session_id);
                        if still_queued {
                            slots.queued.take()
                        } else {
                            None
                        }
                    };
                    if let Some(session) = orphaned {
                        instance.emit_error(&session, format!("session preparation failed: {err}"));
                    }
                }
            }
        });
    }

    /// Download the session's input files (and fine-tune artifact) into
    /// the instance workspace, rewriting paths to the local copies.
    async fn prefetch(&self, mut session: Session) -> Result<Session, RunnerError> {
        let dir = self
            .cfg
            .workspace
            .join("sessions")
            .join(session.id.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        if let Some(ix) = session
            .interactions
            .iter()
            .rposition(|i| i.creator == Creator::User)
        {
            let remote = session.interactions[ix].files.clone();
            let mut local = Vec::with_capacity(remote.len());
            for key in remote {
                local.push(self.fetch_one(&key, &dir).await?);
            }
            session.interactions[ix].files = local;
        }

        if !session.lora_dir.is_empty() && session.lora_dir != LORA_DIR_NONE {
            let lora_dir = dir.join("lora");
            tokio::fs::create_dir_all(&lora_dir).await?;
            for key in self.filestore.list(&session.lora_dir).await? {
                self.fetch_one(&key, &lora_dir).await?;
            }
            session.lora_dir = lora_dir.display().to_string();
        }

        Ok(session)
    }

    async fn fetch_one(&self, key: &str, dir: &Path) -> Result<String, RunnerError> {
        let name = Path::new(key)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let target = dir.join(name);
        let bytes = self.filestore.download(key).await?;
        tokio::fs::write(&target, bytes).await?;
        Ok(target.display().to_string())
    }

    /// Pop: hand the prepared `next` session's task to the child.
    ///
    /// Promotes `next` to `current`; returns `None` while a session is
    /// still running or nothing is prepared.
    pub fn pop_next_task(&self) -> Option<RunnerTask> {
        let session = {
            let mut slots = self.slots.lock();
            if slots.phase == InstancePhase::Stopped || slots.current.is_some() {
                return None;
            }
            slots.next.take()?
        };

        match adapter_for(self.cfg.model).build_task(&session) {
            Ok(task) => {
                let mut slots = self.slots.lock();
                let now_ms = self.clock.epoch_ms();
                slots.current_scheduled_ms = now_ms;
                slots.current = Some(session);
                slots.phase = InstancePhase::Running;
                touch(&mut slots, &self.clock);
                tracing::debug!(
                    instance = %self.cfg.id,
                    session = %task.session_id,
                    "task popped"
                );
                Some(task)
            }
            Err(err) => {
                self.emit_error(&session, format!("task translation failed: {err}"));
                let mut slots = self.slots.lock();
                if slots.phase != InstancePhase::Stopped {
                    slots.phase = InstancePhase::Idle;
                }
                touch(&mut slots, &self.clock);
                None
            }
        }
    }

    /// Peek: the session the child should load weights for, without
    /// mutating any slot. Current first, then queued, then prepared.
    pub fn peek_initial_session(&self) -> Option<Session> {
        let slots = self.slots.lock();
        slots
            .current
            .clone()
            .or_else(|| slots.queued.clone())
            .or_else(|| slots.next.clone())
    }

    /// Kill the child's process group. Slot cleanup happens when the wait
    /// task observes the exit.
    pub fn stop(&self) {
        let pid = *self.child_pid.lock();
        match pid {
            Some(pid) => process::kill_group(pid),
            None => {
                // Never had a child (spawn failed or test instance).
                let mut slots = self.slots.lock();
                slots.phase = InstancePhase::Stopped;
            }
        }
        self.task_notify.notify_waiters();
    }

    /// Child exited. Errors whatever sessions the instance still held and
    /// parks the instance for the supervisor to reap.
    pub fn on_child_exit(&self, status: ExitStatus) {
        let (current, queued, next) = {
            let mut slots = self.slots.lock();
            slots.phase = InstancePhase::Stopped;
            (
                slots.current.take(),
                slots.queued.take(),
                slots.next.take(),
            )
        };
        self.task_notify.notify_waiters();

        tracing::warn!(
            instance = %self.cfg.id,
            status = %status,
            had_session = current.is_some(),
            "model process exited"
        );

        if let Some(session) = current {
            let tail = self.stderr_tail.contents();
            let mut error = format!("model process exited: {status}");
            if !tail.is_empty() {
                error.push_str("\nstderr tail:\n");
                error.push_str(&tail);
            }
            self.emit_error(&session, error);
        }
        for session in [queued, next].into_iter().flatten() {
            self.emit_error(&session, "instance stopped before session started".to_string());
        }

        self.supervisor_wake.notify_waiters();
    }

    /// Emit a terminal error response for `session`.
    pub(crate) fn emit_error(&self, session: &Session, error: String) {
        let mut resp = RunnerTaskResponse::error(session.id.clone(), error);
        resp.owner = session.owner.clone();
        resp.interaction_id = session
            .working_system_interaction()
            .map(|i| i.id.clone())
            .unwrap_or_default();
        let _ = self.responses.send((self.cfg.id.clone(), resp));
    }

    pub(crate) fn send_response(&self, resp: RunnerTaskResponse) {
        let _ = self.responses.send((self.cfg.id.clone(), resp));
    }

    pub(crate) fn filestore(&self) -> &F {
        &self.filestore
    }

    /// Snapshot the current session under the lock; used by the demuxer.
    pub(crate) fn current_session(&self) -> Option<Session> {
        self.slots.lock().current.clone()
    }

    /// Clear `current` after its terminal response went out.
    pub(crate) fn finish_current(&self, session_id: &SessionId) {
        let mut slots = self.slots.lock();
        let matches = slots
            .current
            .as_ref()
            .is_some_and(|c| &c.id == session_id);
        if !matches {
            return;
        }
        let scheduled = slots.current_scheduled_ms;
        if let Some(session) = slots.current.take() {
            slots.recent.push_back(SessionSummary::of(&session, scheduled));
            while slots.recent.len() > RECENT_RING {
                slots.recent.pop_front();
            }
        }
        if slots.phase != InstancePhase::Stopped {
            slots.phase = InstancePhase::Idle;
        }
        touch(&mut slots, &self.clock);
        drop(slots);
        self.task_notify.notify_waiters();
        self.supervisor_wake.notify_waiters();
    }

    /// Heartbeat snapshot of this instance.
    pub fn state(&self) -> ModelInstanceState {
        let slots = self.slots.lock();
        ModelInstanceState {
            id: self.cfg.id.clone(),
            model: self.cfg.model,
            mode: self.cfg.mode,
            lora_dir: self.cfg.lora_dir.clone(),
            phase: slots.phase,
            initial_session_id: self.initial_session_id.clone(),
            current_session: slots
                .current
                .as_ref()
                .map(|s| SessionSummary::of(s, slots.current_scheduled_ms)),
            recent: slots.recent.iter().cloned().collect(),
            last_activity: slots.last_activity_ms,
            memory: self.memory,
            // A fresh report is never stale; the control-plane registry
            // marks instances that drop out of the heartbeat.
            stale: false,
        }
    }
}

fn touch<K: Clock>(slots: &mut Slots, clock: &K) {
    slots.last_activity = clock.now();
    slots.last_activity_ms = clock.epoch_ms();
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
