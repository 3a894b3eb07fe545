// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Herd runner binary
//!
//! One process per GPU host: serves the runner-local task endpoints and
//! runs the supervisor loop against the configured control plane.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::collections::HashMap;
use std::sync::Arc;

use herd_adapters::ApiFilestore;
use herd_core::{RunnerId, SystemClock};
use herd_runner::{env, server, HttpControlPlane, Supervisor, SupervisorConfig};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("herd-runner {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("herd-runner {}", env!("CARGO_PKG_VERSION"));
                println!("Herd runner - hosts model instances and polls the control plane");
                println!();
                println!("USAGE:");
                println!("    herd-runner");
                println!();
                println!("Configuration is read from HERD_* environment variables:");
                println!("    HERD_API_HOST          control plane URL (default http://127.0.0.1:8844)");
                println!("    HERD_API_TOKEN         bearer token");
                println!("    HERD_RUNNER_ID         stable runner identity");
                println!("    HERD_MEMORY_BYTES      schedulable GPU memory (default 64 GiB)");
                println!("    HERD_POLL_MS           supervisor tick period (default 100)");
                println!("    HERD_INSTANCE_TTL_MS   idle instance eviction (default 300000)");
                println!("    HERD_LOCAL_BIND        local task endpoint bind (default 127.0.0.1:8845)");
                println!("    HERD_WORKSPACE         workspace root");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: herd-runner [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let runner_id = RunnerId::new(env::runner_id());
    let bind = env::local_bind();
    let config = SupervisorConfig {
        runner_id: runner_id.clone(),
        total_memory: env::total_memory(),
        poll_period: env::poll_period(),
        instance_ttl: env::instance_ttl(),
        workspace: env::workspace_dir(),
        local_base_url: format!("http://{bind}"),
        labels: HashMap::new(),
    };

    let host = env::api_host();
    let token = env::api_token();
    let control = HttpControlPlane::new(&host, &token)?;
    let filestore = ApiFilestore::new(&host, &token)?;

    let supervisor = Supervisor::new(config, control, filestore, SystemClock);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(runner = %runner_id, addr = %bind, control = %host, "runner starting");
    let server_supervisor = Arc::clone(&supervisor);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, server::router(server_supervisor)).await {
            tracing::error!(error = %err, "local endpoint server failed");
        }
    });

    let shutdown = Arc::new(Notify::new());
    spawn_signal_watcher(Arc::clone(&shutdown));

    supervisor.run(shutdown).await;
    info!("runner stopped");
    Ok(())
}

fn spawn_signal_watcher(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
        shutdown.notify_waiters();
    });
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
