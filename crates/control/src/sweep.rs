// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner expiry sweep.
//!
//! Runners that stop heartbeating past the TTL are dropped from the
//! registry, and sessions they were running are errored in the store. The
//! control plane does not re-enqueue them; whether to resubmit is the
//! external API's call.

use crate::scheduler::Scheduler;
use herd_adapters::{PushChannel, SessionStore};
use herd_core::{Clock, WebsocketEvent};
use std::sync::Arc;
use std::time::Duration;

/// One sweep pass. Returns the number of sessions errored.
pub async fn expire_runners<S, P, C>(
    scheduler: &Arc<Scheduler<C>>,
    store: &S,
    push: &P,
    ttl: Duration,
) -> usize
where
    S: SessionStore,
    P: PushChannel,
    C: Clock,
{
    let mut errored = 0;
    for state in scheduler.expire_runners(ttl) {
        for instance in &state.instances {
            let Some(summary) = &instance.current_session else {
                continue;
            };
            let session = match store.get_session(&summary.session_id).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(err) => {
                    tracing::error!(
                        session = %summary.session_id,
                        error = %err,
                        "orphan lookup failed"
                    );
                    continue;
                }
            };

            let mut session = session;
            if !session.mark_errored(format!("runner {} disappeared", state.id)) {
                continue;
            }
            if let Err(err) = store.update_session(&session).await {
                tracing::error!(session = %session.id, error = %err, "orphan update failed");
                continue;
            }
            tracing::warn!(
                session = %session.id,
                runner = %state.id,
                "session orphaned by expired runner"
            );
            push.broadcast(&WebsocketEvent::SessionUpdate {
                owner: session.owner.clone(),
                session_id: session.id.clone(),
                session: Some(session),
                response: None,
            });
            errored += 1;
        }
    }
    errored
}

/// Periodic sweep task; runs until the process exits.
pub fn spawn_sweep<S, P, C>(
    scheduler: Arc<Scheduler<C>>,
    store: S,
    push: P,
    ttl: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: SessionStore,
    P: PushChannel,
    C: Clock,
{
    tokio::spawn(async move {
        let period = (ttl / 2).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            expire_runners(&scheduler, &store, &push, ttl).await;
        }
    })
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
