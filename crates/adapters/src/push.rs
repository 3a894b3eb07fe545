// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client push-channel contract.
//!
//! Broadcast is fire-and-forget: the websocket transport behind it is an
//! external collaborator and delivery is at-least-once at best. Nothing in
//! the core waits on a broadcast.

use herd_core::WebsocketEvent;

/// Narrow push-channel contract the control plane consumes.
pub trait PushChannel: Clone + Send + Sync + 'static {
    fn broadcast(&self, event: &WebsocketEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Default)]
pub struct NoopPush;

impl PushChannel for NoopPush {
    fn broadcast(&self, _event: &WebsocketEvent) {}
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePush;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every broadcast event for assertions.
    #[derive(Clone, Default)]
    pub struct FakePush {
        events: Arc<Mutex<Vec<WebsocketEvent>>>,
    }

    impl FakePush {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<WebsocketEvent> {
            self.events.lock().clone()
        }
    }

    impl PushChannel for FakePush {
        fn broadcast(&self, event: &WebsocketEvent) {
            self.events.lock().push(event.clone());
        }
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
