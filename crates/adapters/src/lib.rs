// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd-adapters: seams to everything the core collaborates with.
//!
//! Per-model adapters (spawn command, task translation, stdout framing),
//! plus the narrow contracts the scheduling core consumes from external
//! services: blob filestore, relational session store, client push channel,
//! and the control plane as seen from a runner. Each trait has a fake
//! implementation behind the `test-support` feature.

pub mod control;
pub mod filestore;
pub mod model;
pub mod push;
pub mod store;

pub use control::{ControlPlane, ControlPlaneError};
pub use filestore::{ApiFilestore, Filestore, FilestoreError};
pub use model::{
    adapter_for, ChildCommand, Emit, ModelAdapter, ProcessConfig, StreamPair, StreamSink,
    TaskError,
};
pub use push::{NoopPush, PushChannel};
pub use store::{MemorySessionStore, SessionStore, StoreError};

#[cfg(any(test, feature = "test-support"))]
pub use control::FakeControlPlane;
#[cfg(any(test, feature = "test-support"))]
pub use filestore::FakeFilestore;
#[cfg(any(test, feature = "test-support"))]
pub use push::FakePush;
