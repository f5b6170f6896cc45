// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine.

/// Default base image layered with bundle data.
pub const DEFAULT_BASE_IMAGE: &str = "rancher/support-bundle-kit:master-head";

/// Log line the simulator prints once every resource is loaded.
pub const DEFAULT_READY_SENTINEL: &str = "All resources loaded successfully";

pub const DEFAULT_BUILD_WORKERS: usize = 3;
pub const DEFAULT_BUILD_QUEUE: usize = 100;

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn positive(var: &str) -> Option<usize> {
    non_empty(var)
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// `SIM_BASE_IMAGE`
pub fn base_image() -> String {
    non_empty("SIM_BASE_IMAGE").unwrap_or_else(|| DEFAULT_BASE_IMAGE.to_string())
}

/// `SIM_READY_SENTINEL`
pub fn ready_sentinel() -> String {
    non_empty("SIM_READY_SENTINEL").unwrap_or_else(|| DEFAULT_READY_SENTINEL.to_string())
}

/// `SIM_BUILD_WORKERS`, ignored unless a positive integer.
pub fn build_workers() -> usize {
    positive("SIM_BUILD_WORKERS").unwrap_or(DEFAULT_BUILD_WORKERS)
}

/// `SIM_BUILD_QUEUE`, ignored unless a positive integer.
pub fn build_queue() -> usize {
    positive("SIM_BUILD_QUEUE").unwrap_or(DEFAULT_BUILD_QUEUE)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
