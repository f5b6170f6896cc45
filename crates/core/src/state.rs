// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulator instance lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an instance sits in its lifecycle, derived from runtime + store.
///
/// `Absent -> Built -> Running(Initializing | Ready) -> Stopped -> Removed`.
/// `Removed` is indistinguishable from `Absent` once cleanup has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// No container and no image.
    Absent,
    /// Image exists, no container.
    Built,
    /// Container running, readiness sentinel not yet seen.
    Initializing,
    /// Container running and the version is marked ready.
    Ready,
    /// Container exists but is not running.
    Stopped,
}

impl InstanceState {
    /// Derive the state from runtime observations and the stored ready flag.
    pub fn derive(has_image: bool, container: Option<bool>, ready: bool) -> Self {
        match container {
            Some(true) if ready => InstanceState::Ready,
            Some(true) => InstanceState::Initializing,
            Some(false) => InstanceState::Stopped,
            None if has_image => InstanceState::Built,
            None => InstanceState::Absent,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, InstanceState::Initializing | InstanceState::Ready)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceState::Absent => "absent",
            InstanceState::Built => "built",
            InstanceState::Initializing => "initializing",
            InstanceState::Ready => "ready",
            InstanceState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Status reported to callers of `status(workspace, version)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub running: bool,
    pub ready: bool,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
