// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specifications for the Herd scheduling core.
//!
//! These tests wire the control-plane scheduler and the runner supervisor
//! together in process, with the collaborator seams faked, and verify the
//! end-to-end scheduling scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// scheduler/
#[path = "specs/scheduler/warm_cold.rs"]
mod scheduler_warm_cold;

// instance/
#[path = "specs/instance/crash.rs"]
mod instance_crash;
#[path = "specs/instance/prefetch.rs"]
mod instance_prefetch;

#[path = "specs/end_to_end.rs"]
mod end_to_end;
