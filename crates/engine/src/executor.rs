// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running commands against a simulated or live cluster.
//!
//! A support-bundle version is reached through `exec` in its running
//! simulator container. A runtime version is reached from the host with
//! `KUBECONFIG` pointing at its stored kubeconfig.

use crate::error::EngineError;
use crate::lifecycle::ADMIN_KUBECONFIG_PATH;
use sim_adapters::subprocess::{run_with_timeout, stderr_text, EXEC_TIMEOUT};
use sim_adapters::{ExecOutput, RuntimeAdapter, RuntimeError};
use sim_core::{instance_name, InstanceName, VersionKind};
use sim_storage::Workspace;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Where a command runs
#[derive(Debug, Clone)]
pub enum ClusterExecutor<R> {
    /// Inside a running simulator container
    Container { runtime: R, instance: InstanceName },
    /// On the host, against a live cluster
    Host { kubeconfig: PathBuf },
}

impl<R: RuntimeAdapter> ClusterExecutor<R> {
    /// Kubeconfig path as seen by the command.
    pub fn kubeconfig(&self) -> String {
        match self {
            ClusterExecutor::Container { .. } => ADMIN_KUBECONFIG_PATH.to_string(),
            ClusterExecutor::Host { kubeconfig } => kubeconfig.display().to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ClusterExecutor::Container { instance, .. } => format!("simulator {instance}"),
            ClusterExecutor::Host { kubeconfig } => {
                format!("runtime cluster ({})", kubeconfig.display())
            }
        }
    }

    /// Run `cmd` with extra `env`, capturing output. Non-zero exit is an error.
    pub async fn exec(
        &self,
        cmd: &[String],
        env: &[(String, String)],
    ) -> Result<ExecOutput, EngineError> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(EngineError::InvalidRequest("empty command".to_string()));
        };
        match self {
            ClusterExecutor::Container { runtime, instance } => runtime
                .exec(instance.as_str(), cmd, env)
                .await
                .map_err(|e| EngineError::runtime("exec in", instance.as_str(), e)),
            ClusterExecutor::Host { kubeconfig } => {
                let mut command = Command::new(program);
                command
                    .args(args)
                    .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .env("KUBECONFIG", kubeconfig);
                debug!(program = %program, "running command on host");
                let output = run_with_timeout(command, EXEC_TIMEOUT, program)
                    .await
                    .map_err(|e| EngineError::runtime("exec on", "host", RuntimeError::Unavailable(e)))?;
                if !output.status.success() {
                    return Err(EngineError::runtime(
                        "exec on",
                        "host",
                        RuntimeError::CommandFailed {
                            code: output.status.code().unwrap_or(-1),
                            stderr: stderr_text(&output),
                        },
                    ));
                }
                Ok(ExecOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        }
    }

    /// Run `kubectl <args>` against the cluster.
    pub async fn kubectl(&self, args: &[String]) -> Result<ExecOutput, EngineError> {
        let cmd: Vec<String> = std::iter::once("kubectl".to_string())
            .chain(args.iter().cloned())
            .collect();
        let env = vec![("KUBECONFIG".to_string(), self.kubeconfig())];
        self.exec(&cmd, &env).await
    }
}

/// Pick the newest usable cluster in a workspace.
///
/// Versions are tried newest first: a runtime version is always usable,
/// a support-bundle version only while its simulator is running.
pub async fn find_latest_available<R: RuntimeAdapter>(
    runtime: &R,
    workspace: &Workspace,
) -> Result<ClusterExecutor<R>, EngineError> {
    for version in workspace.versions.iter().rev() {
        match version.kind {
            VersionKind::Runtime => {
                if let Some(kubeconfig) = &version.kubeconfig_path {
                    return Ok(ClusterExecutor::Host {
                        kubeconfig: kubeconfig.clone(),
                    });
                }
            }
            VersionKind::SupportBundle => {
                let instance = instance_name(&workspace.name, &version.id);
                match runtime.find_containers(instance.as_str(), false).await {
                    Ok(running) if !running.is_empty() => {
                        return Ok(ClusterExecutor::Container {
                            runtime: runtime.clone(),
                            instance,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => warn!(instance = %instance, error = %e, "cannot inspect simulator"),
                }
            }
        }
    }
    Err(EngineError::NotFound(format!(
        "no running simulator or runtime cluster found in workspace {}",
        workspace.name
    )))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
