// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Container runtime CLI binary (default: `docker`).
pub fn docker_bin() -> String {
    std::env::var("SIM_DOCKER_BIN")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "docker".to_string())
}

/// Timeout for short runtime CLI calls (default: 30000ms).
pub fn docker_timeout() -> Duration {
    parse_duration_ms("SIM_DOCKER_TIMEOUT_MS").unwrap_or(crate::subprocess::DOCKER_TIMEOUT)
}

/// Timeout for a single image build (default: 30 minutes).
pub fn build_timeout() -> Duration {
    parse_duration_ms("SIM_BUILD_TIMEOUT_MS").unwrap_or(crate::subprocess::BUILD_TIMEOUT)
}
