// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner supervisor: owns every model instance on this host.
//!
//! One cooperative tick per poll period, plus event-driven wakeups when an
//! instance finishes a session. A tick reaps stopped instances, evicts
//! idle ones past their timeout, heartbeats the control plane, and polls
//! for one session, routing it to a warm idle instance or spawning a
//! fresh one.

use crate::client::Backoff;
use crate::instance::{InstanceConfig, ModelInstance, ResponseTx};
use herd_core::{
    Clock, IdGen, InstanceId, Model, ModelModePair, RunnerId, RunnerState, RunnerTaskResponse,
    Session, SessionFilter, UuidIdGen,
};
use herd_adapters::{ControlPlane, Filestore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Poll-failure backoff bounds.
const POLL_BACKOFF_BASE: Duration = Duration::from_millis(500);
const POLL_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Response-upload retry policy.
const RESPONSE_RETRY_BASE: Duration = Duration::from_millis(200);
const RESPONSE_RETRY_CAP: Duration = Duration::from_secs(5);
const RESPONSE_RETRY_LIMIT: u32 = 5;

/// Static configuration of one runner host.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub runner_id: RunnerId,
    /// Total GPU memory the supervisor may hand to instances.
    pub total_memory: u64,
    pub poll_period: Duration,
    /// Idle instances past this age are evicted.
    pub instance_ttl: Duration,
    pub workspace: PathBuf,
    /// Base URL of the runner-local endpoint server.
    pub local_base_url: String,
    pub labels: HashMap<String, String>,
}

/// Owns the model instances on one host.
pub struct Supervisor<C: ControlPlane, F: Filestore, K: Clock> {
    cfg: SupervisorConfig,
    control: C,
    filestore: F,
    clock: K,
    id_gen: UuidIdGen,
    instances: Mutex<HashMap<InstanceId, Arc<ModelInstance<F, K>>>>,
    responses_tx: ResponseTx,
    wake: Arc<Notify>,
    backoff: Mutex<Backoff>,
}

impl<C: ControlPlane, F: Filestore, K: Clock> Supervisor<C, F, K> {
    /// Build the supervisor and start its response forwarder.
    pub fn new(cfg: SupervisorConfig, control: C, filestore: F, clock: K) -> Arc<Self> {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_responses(control.clone(), responses_rx));

        Arc::new(Self {
            cfg,
            control,
            filestore,
            clock,
            id_gen: UuidIdGen,
            instances: Mutex::new(HashMap::new()),
            responses_tx,
            wake: Arc::new(Notify::new()),
            backoff: Mutex::new(Backoff::new(POLL_BACKOFF_BASE, POLL_BACKOFF_CAP)),
        })
    }

    pub fn runner_id(&self) -> &RunnerId {
        &self.cfg.runner_id
    }

    /// Instance lookup for the local endpoint server.
    pub fn instance(&self, id: &InstanceId) -> Option<Arc<ModelInstance<F, K>>> {
        self.instances.lock().get(id).cloned()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Register an instance under its ID.
    pub(crate) fn adopt(&self, instance: Arc<ModelInstance<F, K>>) {
        self.instances.lock().insert(instance.id().clone(), instance);
    }

    /// Memory not yet committed to an instance.
    pub fn free_memory(&self) -> u64 {
        let used: u64 = self
            .instances
            .lock()
            .values()
            .map(|i| i.memory_bytes())
            .sum();
        self.cfg.total_memory.saturating_sub(used)
    }

    /// Heartbeat snapshot of this runner.
    pub fn state(&self) -> RunnerState {
        let mut instances: Vec<_> = self
            .instances
            .lock()
            .values()
            .map(|i| i.state())
            .collect();
        instances.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        RunnerState {
            id: self.cfg.runner_id.clone(),
            total_memory: self.cfg.total_memory,
            free_memory: self.free_memory(),
            labels: self.cfg.labels.clone(),
            instances,
            decisions: Vec::new(),
        }
    }

    /// Run the supervisor loop until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let mut interval = tokio::time::interval(self.cfg.poll_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                _ = shutdown.notified() => break,
            }
            self.tick().await;
        }
        tracing::info!(runner = %self.cfg.runner_id, "supervisor stopping");
        self.stop_all();
    }

    /// One cooperative tick.
    pub async fn tick(&self) {
        self.reap_stopped();
        self.evict_idle();

        let state = self.state();
        if let Err(err) = self.control.post_state(&state).await {
            tracing::debug!(error = %err, "heartbeat failed");
        }

        // Below the smallest possible footprint nothing can fit; polling
        // would only be answered with sessions we cannot place.
        let free = self.free_memory();
        if free < Model::lowest_memory_bytes() {
            return;
        }

        let filter = self.poll_filter(free);
        match self.control.poll_session(&self.cfg.runner_id, &filter).await {
            Ok(Some(session)) => {
                self.backoff.lock().reset();
                self.place(session);
            }
            Ok(None) => {
                self.backoff.lock().reset();
            }
            Err(err) => {
                let delay = self.backoff.lock().next_delay();
                tracing::warn!(error = %err, delay_ms = delay.as_millis() as u64, "poll failed");
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Stop every instance; their wait tasks finish the teardown.
    pub fn stop_all(&self) {
        for instance in self.instances.lock().values() {
            instance.stop();
        }
    }

    fn reap_stopped(&self) {
        let mut instances = self.instances.lock();
        instances.retain(|id, instance| {
            let keep = !instance.is_stopped();
            if !keep {
                tracing::info!(instance = %id, "reaping stopped instance");
            }
            keep
        });
    }

    fn evict_idle(&self) {
        let now = self.clock.now();
        let ttl = self.cfg.instance_ttl;
        let evict: Vec<Arc<ModelInstance<F, K>>> = {
            let instances = self.instances.lock();
            instances
                .values()
                .filter(|i| i.is_idle() && now.duration_since(i.last_activity()) > ttl)
                .cloned()
                .collect()
        };
        for instance in evict {
            tracing::info!(
                instance = %instance.id(),
                model = %instance.model(),
                "evicting idle instance"
            );
            instance.stop();
            self.instances.lock().remove(instance.id());
        }
    }

    /// Broad filter for a cold poll: free capacity, minus one-per-model
    /// pairs the runner is already running.
    fn poll_filter(&self, free: u64) -> SessionFilter {
        let mut reject: Vec<ModelModePair> = Vec::new();
        for instance in self.instances.lock().values() {
            if instance.is_idle() || instance.is_stopped() {
                continue;
            }
            let pair = ModelModePair {
                model: instance.model(),
                mode: instance.mode(),
            };
            if !reject.contains(&pair) {
                reject.push(pair);
            }
        }
        SessionFilter::for_capacity(free, reject)
    }

    /// Route a scheduled session: warm idle instance first, then a fresh
    /// spawn.
    fn place(&self, session: Session) {
        let warm = {
            self.instances
                .lock()
                .values()
                .find(|i| i.is_idle() && i.serves(&session))
                .cloned()
        };
        if let Some(instance) = warm {
            tracing::info!(
                session = %session.id,
                instance = %instance.id(),
                "routing session to warm instance"
            );
            instance.assign(session);
            return;
        }

        // Capacity is re-checked at creation time; the poll's filter was
        // computed a round trip ago.
        let footprint = session.memory_bytes();
        if self.free_memory() < footprint {
            tracing::warn!(
                session = %session.id,
                footprint,
                "no capacity for scheduled session"
            );
            self.emit_session_error(&session, "runner out of memory for session");
            return;
        }

        self.spawn_instance(session);
    }

    fn spawn_instance(&self, session: Session) {
        let id = InstanceId::new(self.id_gen.next());
        let config = InstanceConfig {
            id: id.clone(),
            model: session.model,
            mode: session.mode,
            lora_dir: session.lora_dir.clone(),
            workspace: self.cfg.workspace.join(id.as_str()),
            local_base_url: self.cfg.local_base_url.clone(),
        };
        tracing::info!(
            instance = %id,
            session = %session.id,
            model = %session.model,
            mode = %session.mode,
            "spawning model instance"
        );

        let instance = ModelInstance::new(
            config,
            session.id.clone(),
            self.filestore.clone(),
            self.clock.clone(),
            self.responses_tx.clone(),
            Arc::clone(&self.wake),
        );
        match instance.start(session.clone()) {
            Ok(()) => {
                self.adopt(instance);
            }
            Err(err) => {
                tracing::error!(session = %session.id, error = %err, "instance spawn failed");
                self.emit_session_error(&session, &format!("instance spawn failed: {err}"));
            }
        }
    }

    /// Terminal error for a session that never reached an instance;
    /// attributed to the runner itself.
    fn emit_session_error(&self, session: &Session, error: &str) {
        let mut resp = RunnerTaskResponse::error(session.id.clone(), error);
        resp.owner = session.owner.clone();
        resp.interaction_id = session
            .working_system_interaction()
            .map(|i| i.id.clone())
            .unwrap_or_default();
        let _ = self
            .responses_tx
            .send((InstanceId::new(self.cfg.runner_id.as_str()), resp));
    }
}

/// Single consumer of every instance's responses; posts them upstream in
/// arrival order with bounded retries.
async fn forward_responses<C: ControlPlane>(
    control: C,
    mut rx: mpsc::UnboundedReceiver<(InstanceId, RunnerTaskResponse)>,
) {
    while let Some((instance, resp)) = rx.recv().await {
        let mut backoff = Backoff::new(RESPONSE_RETRY_BASE, RESPONSE_RETRY_CAP);
        let mut attempts = 0u32;
        loop {
            match control.post_response(&instance, &resp).await {
                Ok(()) => break,
                Err(err) if attempts < RESPONSE_RETRY_LIMIT => {
                    attempts += 1;
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        session = %resp.session_id,
                        error = %err,
                        attempt = attempts,
                        "response upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        session = %resp.session_id,
                        error = %err,
                        "response upload failed, dropping"
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
