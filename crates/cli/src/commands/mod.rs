// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod clean;
pub mod daemon;
pub mod instances;
pub mod simulator;
pub mod version;
pub mod workspace;
