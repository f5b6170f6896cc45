// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sim-core: Shared identifiers and state types for the simulator orchestrator

pub mod id;
pub mod instance;
pub mod state;
pub mod time_fmt;
pub mod version;
pub mod workspace;

pub use id::ShortId;
pub use instance::{
    image_tag, instance_name, InstanceName, BUNDLE_LABEL, IMAGE_PREFIX, SIMULATOR_API_PORT,
};
pub use state::{InstanceState, InstanceStatus};
pub use time_fmt::format_age;
pub use version::{VersionId, VersionKind};
pub use workspace::{NameError, WorkspaceName};
