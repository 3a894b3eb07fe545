// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the control plane.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: HERD_STATE_DIR > XDG_STATE_HOME/herd > ~/.local/state/herd
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("HERD_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("herd"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/herd"))
}

/// Bind address for the HTTP surface (default 127.0.0.1:8844).
pub fn bind_addr() -> String {
    std::env::var("HERD_CONTROL_BIND").unwrap_or_else(|_| "127.0.0.1:8844".to_string())
}

/// Decision ring bound per runner (default 256).
pub fn decision_ring_size() -> usize {
    std::env::var("HERD_DECISION_RING")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(256)
}

/// Runner heartbeat TTL (default 30s).
pub fn runner_ttl() -> Duration {
    std::env::var("HERD_RUNNER_TTL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Cold-match minimum session age (default 0).
pub fn sched_min_age() -> Duration {
    std::env::var("HERD_SCHED_MIN_AGE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
