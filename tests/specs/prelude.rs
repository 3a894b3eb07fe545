// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the workspace specs.

#![allow(dead_code)]

use async_trait::async_trait;
use herd_adapters::{ControlPlane, ControlPlaneError, FakeFilestore};
use herd_control::{Scheduler, SchedulerConfig};
use herd_core::test_support::SessionBuilder;
use herd_core::{
    FakeClock, InstanceId, RunnerId, RunnerState, RunnerTaskResponse, Session, SessionFilter,
    SessionId,
};
use herd_runner::{InstanceConfig, ModelInstance, ResponseTx};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

/// The control plane wired directly to an in-process scheduler, as the
/// runner sees it over HTTP in production.
#[derive(Clone)]
pub struct LocalControl {
    pub scheduler: Arc<Scheduler<FakeClock>>,
    pub responses: Arc<Mutex<Vec<(InstanceId, RunnerTaskResponse)>>>,
}

impl LocalControl {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(SchedulerConfig::default(), clock)),
            responses: Arc::default(),
        }
    }

    pub fn responses_for(&self, id: &SessionId) -> Vec<RunnerTaskResponse> {
        self.responses
            .lock()
            .iter()
            .filter(|(_, r)| &r.session_id == id)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl ControlPlane for LocalControl {
    async fn poll_session(
        &self,
        runner: &RunnerId,
        filter: &SessionFilter,
    ) -> Result<Option<Session>, ControlPlaneError> {
        Ok(self.scheduler.schedule(runner, filter))
    }

    async fn post_response(
        &self,
        instance: &InstanceId,
        response: &RunnerTaskResponse,
    ) -> Result<(), ControlPlaneError> {
        self.responses
            .lock()
            .push((instance.clone(), response.clone()));
        Ok(())
    }

    async fn post_state(&self, state: &RunnerState) -> Result<(), ControlPlaneError> {
        self.scheduler.heartbeat(state.clone());
        Ok(())
    }
}

/// A standalone model instance with its own response channel.
pub struct InstanceHarness {
    pub instance: Arc<ModelInstance<FakeFilestore, FakeClock>>,
    pub responses: UnboundedReceiver<(InstanceId, RunnerTaskResponse)>,
    pub filestore: FakeFilestore,
    pub clock: FakeClock,
    pub workspace: tempfile::TempDir,
}

pub fn instance_harness() -> InstanceHarness {
    let workspace = tempfile::tempdir().unwrap();
    let filestore = FakeFilestore::new();
    let clock = FakeClock::new();
    let (tx, responses): (ResponseTx, _) = tokio::sync::mpsc::unbounded_channel();
    let instance = ModelInstance::new(
        InstanceConfig {
            id: InstanceId::new("i1"),
            model: herd_core::Model::Mistral7bInstruct,
            mode: herd_core::SessionMode::Inference,
            lora_dir: String::new(),
            workspace: workspace.path().to_path_buf(),
            local_base_url: "http://127.0.0.1:0".to_string(),
        },
        SessionId::new("s0"),
        filestore.clone(),
        clock.clone(),
        tx,
        Arc::new(Notify::new()),
    );
    InstanceHarness {
        instance,
        responses,
        filestore,
        clock,
        workspace,
    }
}

/// Session fixture; see [`SessionBuilder`] for the defaults.
pub fn session(id: &str) -> SessionBuilder {
    SessionBuilder::new(id)
}

/// Poll `cond` until it holds or a generous deadline passes.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
