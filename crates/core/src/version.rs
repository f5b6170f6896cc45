// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version identifiers and kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::string_id! {
    /// Per-workspace version identifier of the form `v<n>`.
    pub struct VersionId;
}

impl VersionId {
    /// Build the identifier for sequence number `n`.
    pub fn from_seq(n: u64) -> Self {
        Self(format!("v{n}"))
    }

    /// Sequence number encoded in the identifier, if it has the `v<n>` form.
    pub fn seq(&self) -> Option<u64> {
        self.0.strip_prefix('v')?.parse().ok()
    }
}

/// What a version was created from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionKind {
    /// A support-bundle archive replayed inside a simulator container.
    #[default]
    SupportBundle,
    /// A kubeconfig for a live cluster; no simulator is needed.
    Runtime,
}

impl VersionKind {
    /// Runtime versions are usable immediately; bundles wait for the simulator.
    pub fn initially_ready(self) -> bool {
        matches!(self, VersionKind::Runtime)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionKind::SupportBundle => "support-bundle",
            VersionKind::Runtime => "runtime",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
