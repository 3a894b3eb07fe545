// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-runner bookkeeping on the control plane.
//!
//! A runner entry is created on its first poll or heartbeat, refreshed on
//! every contact, and expired after going silent past the TTL. Each entry
//! carries a bounded ring of scheduling decisions for the dashboard.

use herd_core::{
    InstancePhase, Model, RunnerId, RunnerState, SchedulingDecision, SessionMode,
};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// One known runner.
#[derive(Debug)]
pub struct RunnerEntry {
    pub state: RunnerState,
    pub last_seen: Instant,
    decisions: VecDeque<SchedulingDecision>,
}

impl RunnerEntry {
    fn new(state: RunnerState, now: Instant) -> Self {
        Self {
            state,
            last_seen: now,
            decisions: VecDeque::new(),
        }
    }

    /// State snapshot with decision lines filled in, oldest first.
    fn render(&self) -> RunnerState {
        let mut state = self.state.clone();
        state.decisions = self.decisions.iter().map(|d| d.to_string()).collect();
        state
    }
}

/// All known runners.
#[derive(Debug)]
pub struct RunnerRegistry {
    ring_size: usize,
    runners: HashMap<RunnerId, RunnerEntry>,
}

impl RunnerRegistry {
    pub fn new(ring_size: usize) -> Self {
        Self {
            ring_size,
            runners: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Apply a heartbeat, creating the entry on first contact.
    ///
    /// Runners never report an instance as stale themselves; staleness is
    /// derived here. An instance present in the previous heartbeat but
    /// missing from this one is retained for one generation with
    /// `stale = true`, so dashboards see it go and the warm phase never
    /// pins a filter to an instance that just vanished.
    pub fn heartbeat(&mut self, mut state: RunnerState, now: Instant) {
        match self.runners.get_mut(&state.id) {
            Some(entry) => {
                let mut ghosts: Vec<_> = entry
                    .state
                    .instances
                    .iter()
                    .filter(|old| {
                        !old.stale && !state.instances.iter().any(|new| new.id == old.id)
                    })
                    .cloned()
                    .collect();
                for ghost in &mut ghosts {
                    tracing::debug!(
                        runner = %state.id,
                        instance = %ghost.id,
                        "instance gone from heartbeat, marking stale"
                    );
                    ghost.stale = true;
                }
                state.instances.extend(ghosts);

                entry.state = state;
                entry.last_seen = now;
            }
            None => {
                tracing::info!(runner = %state.id, "runner appeared");
                self.runners
                    .insert(state.id.clone(), RunnerEntry::new(state, now));
            }
        }
    }

    /// Record a scheduling decision on the runner's bounded ring.
    ///
    /// Polls may precede the first heartbeat; a placeholder entry is
    /// created so the decision is not lost.
    pub fn record(&mut self, runner: &RunnerId, decision: SchedulingDecision, now: Instant) {
        let entry = self.runners.entry(runner.clone()).or_insert_with(|| {
            RunnerEntry::new(
                RunnerState {
                    id: runner.clone(),
                    total_memory: 0,
                    free_memory: 0,
                    labels: HashMap::new(),
                    instances: Vec::new(),
                    decisions: Vec::new(),
                },
                now,
            )
        });
        entry.last_seen = now;
        entry.decisions.push_back(decision);
        while entry.decisions.len() > self.ring_size {
            entry.decisions.pop_front();
        }
    }

    /// (model, mode, lora_dir) tuples of the runner's idle instances, for
    /// the scheduler's warm phase.
    pub fn idle_instances(&self, runner: &RunnerId) -> Vec<(Model, SessionMode, String)> {
        self.runners
            .get(runner)
            .map(|entry| {
                entry
                    .state
                    .instances
                    .iter()
                    .filter(|i| i.phase == InstancePhase::Idle && !i.stale)
                    .map(|i| (i.model, i.mode, i.lora_dir.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove and return runners silent for longer than `ttl`.
    pub fn expire(&mut self, ttl: Duration, now: Instant) -> Vec<RunnerState> {
        let expired: Vec<RunnerId> = self
            .runners
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| {
                tracing::warn!(runner = %id, "runner expired");
                self.runners.remove(&id).map(|e| e.render())
            })
            .collect()
    }

    /// All runners with rendered decision rings, stable order by ID.
    pub fn snapshot(&self) -> Vec<RunnerState> {
        let mut states: Vec<RunnerState> = self.runners.values().map(RunnerEntry::render).collect();
        states.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        states
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
