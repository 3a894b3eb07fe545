// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn api_host_default() {
    std::env::remove_var("HERD_API_HOST");
    assert_eq!(api_host(), "http://127.0.0.1:8844");
}

#[test]
fn runner_id_is_generated_when_unset() {
    std::env::remove_var("HERD_RUNNER_ID");
    let a = runner_id();
    let b = runner_id();
    assert!(a.starts_with("runner-"));
    // Generated per call; a stable identity comes from the variable.
    assert_ne!(a, b);
}

#[test]
fn total_memory_rejects_zero_and_junk() {
    std::env::set_var("HERD_MEMORY_BYTES", "0");
    assert_eq!(total_memory(), 64 << 30);
    std::env::set_var("HERD_MEMORY_BYTES", "junk");
    assert_eq!(total_memory(), 64 << 30);
    std::env::set_var("HERD_MEMORY_BYTES", "17179869184");
    assert_eq!(total_memory(), 16 << 30);
    std::env::remove_var("HERD_MEMORY_BYTES");
}

#[test]
fn poll_period_parses_millis() {
    std::env::set_var("HERD_POLL_MS", "250");
    assert_eq!(poll_period(), Duration::from_millis(250));
    std::env::remove_var("HERD_POLL_MS");
    assert_eq!(poll_period(), Duration::from_millis(100));
}

#[test]
fn instance_ttl_default_is_five_minutes() {
    std::env::remove_var("HERD_INSTANCE_TTL_MS");
    assert_eq!(instance_ttl(), Duration::from_secs(300));
}

#[test]
fn workspace_dir_prefers_override() {
    std::env::set_var("HERD_WORKSPACE", "/tmp/herd-test-ws");
    assert_eq!(workspace_dir(), PathBuf::from("/tmp/herd-test-ws"));
    std::env::remove_var("HERD_WORKSPACE");
}
