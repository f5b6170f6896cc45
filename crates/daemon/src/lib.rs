// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulator Daemon library
//!
//! Exposes the IPC protocol types for CLI clients, and the lifecycle and
//! listener pieces the `simd` binary is assembled from.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod protocol;

pub use protocol::{
    InstanceEntry, Request, Response, VersionSummary, WorkspaceDetail, WorkspaceSummary,
    DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
