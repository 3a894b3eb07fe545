// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client fan-out.
//!
//! The control plane broadcasts session updates into a tokio broadcast
//! channel; the websocket transport (an external collaborator) subscribes
//! and forwards to connected clients. Lagging or absent subscribers never
//! block the scheduling path.

use herd_adapters::PushChannel;
use herd_core::WebsocketEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-channel backed push fan-out.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<WebsocketEvent>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream. Slow receivers observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<WebsocketEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl PushChannel for Broadcaster {
    fn broadcast(&self, event: &WebsocketEvent) {
        // Send fails only when there are no subscribers; that is fine.
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
