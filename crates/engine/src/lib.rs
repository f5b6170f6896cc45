// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Simulator lifecycle engine: builds, instances, readiness, cleanup

pub mod build_pool;
mod catalog;
pub mod cleaner;
mod config;
pub mod env;
mod error;
pub mod executor;
mod files;
pub mod lifecycle;
mod orchestrator;
pub mod readiness;

#[cfg(test)]
mod test_helpers;

pub use build_pool::{BuildError, BuildPoolConfig, BuildWorkerPool};
pub use catalog::Catalog;
pub use cleaner::{format_results, CleanResult, Cleaner};
pub use config::EngineConfig;
pub use error::EngineError;
pub use executor::ClusterExecutor;
pub use lifecycle::{Endpoint, InstanceManager, StartAction, StartOutcome};
pub use orchestrator::{CleanScope, DeleteReport, Orchestrator};
pub use readiness::{MonitorOutcome, MonitorRegistry, ReadinessMonitor};
