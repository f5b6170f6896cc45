// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance identity.
//!
//! Every container and image that belongs to a (workspace, version) pair is
//! named from [`instance_name`]. Lifecycle and cleanup paths both go through
//! these functions so they always agree on which runtime objects they own.

use crate::{VersionId, WorkspaceName};

/// Repository name for managed simulator images, also the ownership label key.
pub const IMAGE_PREFIX: &str = "sim-cli-managed";

/// Label recording which bundle an image or container was built from.
pub const BUNDLE_LABEL: &str = "sim-cli-managed.bundle";

/// Port the simulator API server listens on inside the container.
pub const SIMULATOR_API_PORT: u16 = 6443;

crate::string_id! {
    /// Derived `<workspace>-<version>` identity of a simulator instance.
    pub struct InstanceName;
}

/// Derive the instance name for a workspace version.
pub fn instance_name(workspace: &WorkspaceName, version: &VersionId) -> InstanceName {
    InstanceName(format!("{}-{}", workspace, version))
}

/// Image tag built for an instance: `sim-cli-managed:<instance>`.
pub fn image_tag(instance: &InstanceName) -> String {
    format!("{}:{}", IMAGE_PREFIX, instance)
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
