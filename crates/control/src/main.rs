// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Herd control-plane daemon (herdd)
//!
//! Serves the worker HTTP surface, owns the global session queue and
//! scheduler, and sweeps expired runners.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;
use std::sync::Arc;

use herd_adapters::MemorySessionStore;
use herd_control::{env, router, ApiState, Broadcaster, Scheduler, SchedulerConfig};
use herd_core::SystemClock;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("herdd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("herdd {}", env!("CARGO_PKG_VERSION"));
                println!("Herd control plane - session queue, scheduler and worker API");
                println!();
                println!("USAGE:");
                println!("    herdd");
                println!();
                println!("Configuration is read from HERD_* environment variables:");
                println!("    HERD_CONTROL_BIND       bind address (default 127.0.0.1:8844)");
                println!("    HERD_DECISION_RING      decision ring size (default 256)");
                println!("    HERD_RUNNER_TTL_MS      runner heartbeat TTL (default 30000)");
                println!("    HERD_SCHED_MIN_AGE_MS   cold-match minimum session age (default 0)");
                println!("    HERD_STATE_DIR          state directory for logs");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: herdd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let _log_guard = setup_logging()?;

    let config = SchedulerConfig {
        min_age: env::sched_min_age(),
        ring_size: env::decision_ring_size(),
    };
    let scheduler = Arc::new(Scheduler::new(config, SystemClock));
    let store = MemorySessionStore::new();
    let push = Broadcaster::new();

    let ttl = env::runner_ttl();
    herd_control::sweep::spawn_sweep(Arc::clone(&scheduler), store.clone(), push.clone(), ttl);

    let state = ApiState {
        scheduler,
        store,
        push,
    };

    let addr = env::bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "control plane listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("control plane stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `herdd.log` to `.1`/`.2`/`.3`, deleting the oldest. Best-effort:
/// rotation failures are ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Without a state dir, log to stderr only.
    let Some(state_dir) = env::state_dir() else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(&state_dir)?;
    let log_path = state_dir.join("herdd.log");
    rotate_log_if_needed(&log_path);

    let file_appender = tracing_appender::rolling::never(&state_dir, "herdd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
