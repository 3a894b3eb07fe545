// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global scheduler: one session per runner poll, at most.
//!
//! Two-phase match. The warm phase pins a filter to each of the runner's
//! idle instances so work lands on an already-loaded model without a
//! spawn. The cold phase runs the runner's broad capacity filter; a hit
//! there means the runner will spawn a fresh instance.
//!
//! Match-and-remove happens under the queue mutex, so concurrent pollers
//! can never be handed the same session.

use crate::queue::SessionQueue;
use crate::registry::RunnerRegistry;
use herd_core::{
    Clock, NoMatchReason, RunnerId, RunnerState, SchedulingDecision, Session, SessionFilter,
    SessionId,
};
use parking_lot::Mutex;
use std::time::Duration;

/// Scheduler policy knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Soft rate limit: cold matches only consider sessions at least this
    /// old. Zero disables.
    pub min_age: Duration,
    /// Bound of each runner's decision ring.
    pub ring_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_age: Duration::ZERO,
            ring_size: 256,
        }
    }
}

/// Control-plane scheduler over the global session queue.
pub struct Scheduler<C: Clock> {
    queue: Mutex<SessionQueue>,
    registry: Mutex<RunnerRegistry>,
    clock: C,
    min_age_ms: u64,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(config: SchedulerConfig, clock: C) -> Self {
        Self {
            queue: Mutex::new(SessionQueue::new()),
            registry: Mutex::new(RunnerRegistry::new(config.ring_size)),
            clock,
            min_age_ms: config.min_age.as_millis() as u64,
        }
    }

    /// Admit a session into the queue, idempotent by ID.
    pub fn submit(&self, session: Session) {
        tracing::info!(
            session = %session.id,
            model = %session.model,
            mode = %session.mode,
            "session admitted"
        );
        self.queue.lock().enqueue(session);
    }

    /// Drop a pending session, e.g. when the owner deletes it.
    pub fn withdraw(&self, id: &SessionId) -> Option<Session> {
        self.queue.lock().remove(id)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn queue_snapshot(&self) -> Vec<Session> {
        self.queue.lock().snapshot()
    }

    /// Apply a runner heartbeat.
    pub fn heartbeat(&self, state: RunnerState) {
        self.registry.lock().heartbeat(state, self.clock.now());
    }

    pub fn runners_snapshot(&self) -> Vec<RunnerState> {
        self.registry.lock().snapshot()
    }

    /// Remove runners silent past `ttl`, returning their last states so
    /// the caller can error orphaned sessions.
    pub fn expire_runners(&self, ttl: Duration) -> Vec<RunnerState> {
        self.registry.lock().expire(ttl, self.clock.now())
    }

    /// Pick at most one session for a polling runner.
    pub fn schedule(&self, runner: &RunnerId, filter: &SessionFilter) -> Option<Session> {
        let now_ms = self.clock.epoch_ms();
        let warm_targets = self.registry.lock().idle_instances(runner);

        let (session, decision) = {
            let mut queue = self.queue.lock();

            // Warm phase: route to an already-loaded idle instance.
            let warm_hit = warm_targets.into_iter().find_map(|(model, mode, lora)| {
                let pinned = SessionFilter::for_instance(model, mode, lora);
                let id = queue.match_filter(&pinned, now_ms)?.id.clone();
                queue.remove(&id)
            });

            match warm_hit {
                Some(session) => {
                    let decision = SchedulingDecision::warm(&session, now_ms);
                    (Some(session), decision)
                }
                None => {
                    // Cold phase: anything the runner can fit.
                    let mut broad = filter.clone();
                    broad.older_ms = broad.older_ms.max(self.min_age_ms);
                    let hit_id = queue.match_filter(&broad, now_ms).map(|s| s.id.clone());
                    let cold_hit = hit_id.and_then(|id| queue.remove(&id));
                    match cold_hit {
                        Some(session) => {
                            let decision = SchedulingDecision::cold(&session, now_ms);
                            (Some(session), decision)
                        }
                        None => {
                            let reason = if queue.is_empty() {
                                NoMatchReason::QueueEmpty
                            } else {
                                NoMatchReason::NoFit
                            };
                            (None, SchedulingDecision::no_match(reason, now_ms))
                        }
                    }
                }
            }
        };

        if let Some(session) = &session {
            tracing::info!(
                runner = %runner,
                session = %session.id,
                kind = ?decision.kind,
                "session scheduled"
            );
        }
        self.registry
            .lock()
            .record(runner, decision, self.clock.now());
        session
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
