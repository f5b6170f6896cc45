// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the simulator engine

use crate::build_pool::BuildError;
use crate::cleaner::CleanResult;
use sim_adapters::RuntimeError;
use sim_core::NameError;
use sim_storage::StoreError;
use thiserror::Error;

/// Errors returned by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),
    #[error("failed to {op} {instance}: {source}")]
    Runtime {
        op: &'static str,
        instance: String,
        #[source]
        source: RuntimeError,
    },
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("{}", partial_cleanup_message(.0))]
    PartialCleanup(Vec<CleanResult>),
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Wrap a runtime failure with the operation and instance it hit.
    pub fn runtime(op: &'static str, instance: impl Into<String>, source: RuntimeError) -> Self {
        EngineError::Runtime {
            op,
            instance: instance.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::WorkspaceNotFound(_) | StoreError::VersionNotFound { .. } => {
                EngineError::NotFound(e.to_string())
            }
            StoreError::Conflict(_) => EngineError::Conflict(e.to_string()),
            other => EngineError::Store(other),
        }
    }
}

fn partial_cleanup_message(results: &[CleanResult]) -> String {
    let failures = crate::cleaner::format_results(results);
    format!(
        "clean failed for {} item(s): {}",
        failures.len(),
        failures.join("; ")
    )
}
