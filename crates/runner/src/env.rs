// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the runner binary.

use std::path::PathBuf;
use std::time::Duration;

/// Control-plane base URL (default http://127.0.0.1:8844).
pub fn api_host() -> String {
    std::env::var("HERD_API_HOST").unwrap_or_else(|_| "http://127.0.0.1:8844".to_string())
}

/// Bearer token for the control plane. Empty means unauthenticated.
pub fn api_token() -> String {
    std::env::var("HERD_API_TOKEN").unwrap_or_default()
}

/// Stable runner identity; generated when unset.
pub fn runner_id() -> String {
    std::env::var("HERD_RUNNER_ID")
        .unwrap_or_else(|_| format!("runner-{}", uuid::Uuid::new_v4()))
}

/// Total GPU memory the supervisor may commit (default 64 GiB).
pub fn total_memory() -> u64 {
    std::env::var("HERD_MEMORY_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(64 << 30)
}

/// Supervisor tick period (default 100ms).
pub fn poll_period() -> Duration {
    std::env::var("HERD_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(100))
}

/// Idle-instance eviction timeout (default 5 minutes).
pub fn instance_ttl() -> Duration {
    std::env::var("HERD_INSTANCE_TTL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(300))
}

/// Bind address for the runner-local task endpoints.
pub fn local_bind() -> String {
    std::env::var("HERD_LOCAL_BIND").unwrap_or_else(|_| "127.0.0.1:8845".to_string())
}

/// Workspace root for instance-private directories.
pub fn workspace_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HERD_WORKSPACE") {
        return PathBuf::from(dir);
    }
    std::env::temp_dir().join("herd-runner")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
