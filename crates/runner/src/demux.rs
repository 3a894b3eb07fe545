// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-response demultiplexer.
//!
//! The model adapter's parser emits raw responses off the child's stdout;
//! this single-consumer task owns everything that happens next: session ID
//! checking, owner/interaction stamping, result-file upload, forwarding,
//! and clearing the current slot on terminal responses. One consumer means
//! responses for a session are forwarded in emission order, and a
//! session's terminal response goes out before the next session's first.

use crate::instance::ModelInstance;
use herd_adapters::Filestore;
use herd_core::{Clock, RunnerTaskResponse, Session};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consume raw parser output for one instance until its channel closes.
pub async fn run<F: Filestore, K: Clock>(
    instance: Arc<ModelInstance<F, K>>,
    mut raw: mpsc::UnboundedReceiver<RunnerTaskResponse>,
) {
    while let Some(resp) = raw.recv().await {
        route(&instance, resp).await;
    }
    tracing::debug!(instance = %instance.id(), "demux stream closed");
}

/// Route one raw response from the child.
pub async fn route<F: Filestore, K: Clock>(
    instance: &ModelInstance<F, K>,
    mut resp: RunnerTaskResponse,
) {
    let Some(current) = instance.current_session() else {
        tracing::warn!(
            instance = %instance.id(),
            session = %resp.session_id,
            "response with no current session dropped"
        );
        return;
    };
    if current.id != resp.session_id {
        tracing::warn!(
            instance = %instance.id(),
            expected = %current.id,
            got = %resp.session_id,
            "response for wrong session dropped"
        );
        return;
    }

    resp.owner = current.owner.clone();
    resp.interaction_id = current
        .working_system_interaction()
        .map(|i| i.id.clone())
        .unwrap_or_default();

    if resp.is_terminal() && resp.error.is_empty() {
        if let Err(err) = upload_outputs(instance, &current, &mut resp).await {
            tracing::warn!(
                instance = %instance.id(),
                session = %current.id,
                error = %err,
                "result upload failed"
            );
            resp.error = format!("result upload failed: {err}");
            resp.files.clear();
            resp.lora_dir.clear();
        }
    }

    let terminal = resp.is_terminal();
    instance.send_response(resp);
    if terminal {
        instance.finish_current(&current.id);
    }
}

/// Move the result's local artifacts into the filestore, rewriting the
/// response to carry filestore keys.
async fn upload_outputs<F: Filestore, K: Clock>(
    instance: &ModelInstance<F, K>,
    session: &Session,
    resp: &mut RunnerTaskResponse,
) -> Result<(), crate::error::RunnerError> {
    let store = instance.filestore();

    let mut remote_files = Vec::with_capacity(resp.files.len());
    for local in &resp.files {
        let name = file_name(local);
        let key = format!("sessions/{}/results/{}", session.id, name);
        let bytes = tokio::fs::read(local).await?;
        store.upload(&key, bytes).await?;
        remote_files.push(key);
    }
    resp.files = remote_files;

    if !resp.lora_dir.is_empty() {
        let prefix = format!("loras/{}", session.id);
        let mut entries = tokio::fs::read_dir(&resp.lora_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let bytes = tokio::fs::read(entry.path()).await?;
            store.upload(&format!("{prefix}/{name}"), bytes).await?;
        }
        resp.lora_dir = prefix;
    }

    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

#[cfg(test)]
#[path = "demux_tests.rs"]
mod tests;
