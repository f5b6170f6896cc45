// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace names.
//!
//! A workspace name is the immutable namespace key for a group of versions.
//! It prefixes container names and names a directory on disk, so it is
//! restricted to a conservative character set.

use thiserror::Error;

crate::string_id! {
    /// Unique, immutable name of a workspace.
    pub struct WorkspaceName;
}

/// Maximum accepted workspace name length.
pub const MAX_NAME_LEN: usize = 63;

/// Reasons a workspace name is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("workspace name cannot be empty")]
    Empty,
    #[error("workspace name too long: {0} characters (max {MAX_NAME_LEN})")]
    TooLong(usize),
    #[error("workspace name must start with a letter or digit: {0}")]
    BadStart(String),
    #[error("workspace name contains invalid character {ch:?}: {name}")]
    InvalidChar { name: String, ch: char },
}

impl WorkspaceName {
    /// Trim and validate a user-supplied name.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(name.len()));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(NameError::BadStart(name.to_string()));
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(NameError::InvalidChar {
                name: name.to_string(),
                ch,
            });
        }
        Ok(Self(name.to_string()))
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
