// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the control plane.
//!
//! Implements the [`ControlPlane`] seam over the worker API. Transient
//! failures are the caller's concern; [`Backoff`] provides the shared
//! exponential-with-jitter delay policy.

use async_trait::async_trait;
use herd_adapters::{ControlPlane, ControlPlaneError};
use herd_core::{InstanceId, RunnerId, RunnerState, RunnerTaskResponse, Session, SessionFilter};
use rand::Rng;
use std::time::Duration;

/// Per-request timeout for control-plane calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Control plane over HTTP.
#[derive(Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl HttpControlPlane {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self, ControlPlaneError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn poll_session(
        &self,
        runner: &RunnerId,
        filter: &SessionFilter,
    ) -> Result<Option<Session>, ControlPlaneError> {
        let resp = self
            .http
            .post(format!("{}/api/v1/worker/session", self.base))
            .query(&[("runner_id", runner.as_str())])
            .bearer_auth(&self.token)
            .json(filter)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

        match resp.status().as_u16() {
            204 => Ok(None),
            200 => resp
                .json::<Session>()
                .await
                .map(Some)
                .map_err(|e| ControlPlaneError::Decode(e.to_string())),
            code => Err(ControlPlaneError::Status(code)),
        }
    }

    async fn post_response(
        &self,
        instance: &InstanceId,
        response: &RunnerTaskResponse,
    ) -> Result<(), ControlPlaneError> {
        let resp = self
            .http
            .post(format!(
                "{}/api/v1/worker/response/{}",
                self.base, instance
            ))
            .bearer_auth(&self.token)
            .json(response)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ControlPlaneError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    async fn post_state(&self, state: &RunnerState) -> Result<(), ControlPlaneError> {
        let resp = self
            .http
            .post(format!("{}/api/v1/worker/state", self.base))
            .bearer_auth(&self.token)
            .json(state)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ControlPlaneError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Exponential backoff with jitter.
///
/// Delays double from `base` up to `cap`; each delay gets up to 25%
/// random jitter so a fleet of runners does not thunder in lockstep.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            current: base,
        }
    }

    /// Next delay, growing until the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.cap);
        Self::jitter(delay)
    }

    /// Back to the base delay after a success.
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    fn jitter(delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return delay;
        }
        let spread = (ms / 4).max(1);
        delay + Duration::from_millis(rand::rng().random_range(0..spread))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
