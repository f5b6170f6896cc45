// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI runtime adapter

use super::parse::{parse_images, parse_ps};
use super::{
    BuildSpec, ContainerSpec, ContainerSummary, ExecOutput, ImageSummary, LogStream,
    RuntimeAdapter, RuntimeError,
};
use crate::env;
use crate::subprocess::{run_with_timeout, stderr_text, EXEC_TIMEOUT};
use async_trait::async_trait;
use sim_core::{image_tag, InstanceName, IMAGE_PREFIX};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

const JSON_FORMAT: &str = "{{json .}}";

/// Runtime adapter driving the `docker` CLI.
#[derive(Clone)]
pub struct DockerAdapter {
    bin: String,
}

impl Default for DockerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerAdapter {
    /// Use the binary named by `SIM_DOCKER_BIN` (default `docker`).
    pub fn new() -> Self {
        Self {
            bin: env::docker_bin(),
        }
    }

    pub fn with_binary(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run a short CLI call, failing on non-zero exit.
    async fn run(&self, args: &[String], timeout: Duration) -> Result<Output, RuntimeError> {
        let description = format!(
            "{} {}",
            self.bin,
            args.first().map(String::as_str).unwrap_or_default()
        );
        let mut cmd = self.command();
        cmd.args(args);
        let output = run_with_timeout(cmd, timeout, &description)
            .await
            .map_err(RuntimeError::Unavailable)?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_text(&output),
            });
        }
        Ok(output)
    }

    async fn ps(&self, filter: String, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut args = vec![
            "ps".to_string(),
            "--no-trunc".to_string(),
            "--filter".to_string(),
            filter,
            "--format".to_string(),
            JSON_FORMAT.to_string(),
        ];
        if all {
            args.push("--all".to_string());
        }
        let output = self.run(&args, env::docker_timeout()).await?;
        parse_ps(&String::from_utf8_lossy(&output.stdout))
    }

    /// The single running container named `name`.
    async fn only_running(&self, name: &str) -> Result<ContainerSummary, RuntimeError> {
        let mut running = self.find_containers(name, false).await?;
        match running.len() {
            0 => Err(RuntimeError::NotFound(name.to_string())),
            1 => Ok(running.remove(0)),
            count => Err(RuntimeError::Ambiguous {
                name: name.to_string(),
                count,
            }),
        }
    }

    async fn kill(&self, id: &str) -> Result<(), RuntimeError> {
        self.run(&args(["kill", id]), env::docker_timeout())
            .await
            .map(|_| ())
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Forward lines from `reader` into `tx` until EOF or the receiver is gone.
fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

/// Build output lines that mark a failed step.
fn is_error_frame(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("ERROR") || line.starts_with("error")
}

#[async_trait]
impl RuntimeAdapter for DockerAdapter {
    async fn find_containers(
        &self,
        name: &str,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        // The name filter is a regex over all names; anchor it, then check exactly.
        let mut containers = self
            .ps(format!("name=^/?{}$", name), include_stopped)
            .await?;
        containers.retain(|c| c.name == name);
        Ok(containers)
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut run_args = args(["run", "--detach", "--name", &spec.name, "--network", "bridge"]);
        run_args.push("--publish".to_string());
        run_args.push(format!("0.0.0.0::{}/tcp", spec.exposed_port));
        for (key, value) in &spec.labels {
            run_args.push("--label".to_string());
            run_args.push(format!("{key}={value}"));
        }
        run_args.push(spec.image.clone());
        run_args.extend(spec.command.iter().cloned());

        let output = self.run(&run_args, env::docker_timeout()).await?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::Parse(format!(
                "no container id returned for {}",
                spec.name
            )));
        }
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.run(&args(["start", container_id]), env::docker_timeout())
            .await
            .map(|_| ())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        for container in self.find_containers(name, false).await? {
            self.kill(&container.id).await?;
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        for container in self.find_containers(name, true).await? {
            if container.is_running() {
                self.kill(&container.id).await?;
            }
            self.run(&args(["rm", "--force", &container.id]), env::docker_timeout())
                .await?;
        }
        Ok(())
    }

    async fn build(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        let mut cmd = self.command();
        cmd.arg("build").arg("--tag").arg(&spec.tag);
        for (key, value) in &spec.labels {
            cmd.arg("--label").arg(format!("{key}={value}"));
        }
        cmd.arg(&spec.context_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Unavailable(format!("{} build failed: {}", self.bin, e)))?;

        let (tx, mut rx) = mpsc::channel::<String>(256);
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let drive = async {
            let mut first_error: Option<String> = None;
            let mut last_line = String::new();
            while let Some(line) = rx.recv().await {
                tracing::debug!(tag = %spec.tag, "{}", line);
                if first_error.is_none() && is_error_frame(&line) {
                    first_error = Some(line.trim().to_string());
                }
                if !line.trim().is_empty() {
                    last_line = line.trim().to_string();
                }
            }
            let status = child.wait().await;
            (status, first_error, last_line)
        };

        let timeout = env::build_timeout();
        match tokio::time::timeout(timeout, drive).await {
            Ok((Ok(status), _, _)) if status.success() => Ok(()),
            Ok((Ok(status), first_error, last_line)) => {
                let detail = first_error.unwrap_or(last_line);
                Err(RuntimeError::BuildFailed(if detail.is_empty() {
                    format!("build exited with {status}")
                } else {
                    detail
                }))
            }
            Ok((Err(e), _, _)) => Err(RuntimeError::Unavailable(e.to_string())),
            Err(_) => Err(RuntimeError::BuildFailed(format!(
                "build of {} timed out after {}s",
                spec.tag,
                timeout.as_secs()
            ))),
        }
    }

    async fn find_images(&self, name: &str) -> Result<Vec<ImageSummary>, RuntimeError> {
        let tag = image_tag(&InstanceName::new(name));
        let output = self
            .run(
                &args([
                    "images",
                    "--no-trunc",
                    "--filter",
                    &format!("reference={tag}"),
                    "--format",
                    JSON_FORMAT,
                ]),
                env::docker_timeout(),
            )
            .await?;
        parse_images(&String::from_utf8_lossy(&output.stdout))
    }

    async fn remove_images(&self, name: &str) -> Result<(), RuntimeError> {
        let mut ids: Vec<String> = self
            .find_images(name)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        ids.dedup();
        for id in ids {
            self.run(&args(["rmi", &id]), env::docker_timeout()).await?;
            tracing::info!(image = %id, instance = name, "removed image");
        }
        Ok(())
    }

    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        let container = self.only_running(name).await?;
        let output = self
            .run(&args(["exec", &container.id, "cat", path]), EXEC_TIMEOUT)
            .await?;
        Ok(output.stdout)
    }

    async fn tail_logs(&self, name: &str) -> Result<LogStream, RuntimeError> {
        let container = self.only_running(name).await?;

        let mut cmd = self.command();
        cmd.args(["logs", "--follow", &container.id])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Unavailable(format!("{} logs failed: {}", self.bin, e)))?;

        let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, line_tx.clone());
        }
        drop(line_tx);

        let (tx, stream) = LogStream::channel(256);
        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                if tx.send(Ok(line)).await.is_err() {
                    // Reader went away; dropping the child kills `docker logs`.
                    return;
                }
            }
            match child.wait().await {
                Ok(status) if !status.success() => {
                    let _ = tx
                        .send(Err(RuntimeError::CommandFailed {
                            code: status.code().unwrap_or(-1),
                            stderr: "log stream terminated".to_string(),
                        }))
                        .await;
                }
                Ok(_) => {}
                Err(e) => {
                    let _ = tx.send(Err(RuntimeError::Unavailable(e.to_string()))).await;
                }
            }
        });

        Ok(stream)
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        env: &[(String, String)],
    ) -> Result<ExecOutput, RuntimeError> {
        let mut exec_args = vec!["exec".to_string()];
        for (key, value) in env {
            exec_args.push("--env".to_string());
            exec_args.push(format!("{key}={value}"));
        }
        exec_args.push(name.to_string());
        exec_args.extend(cmd.iter().cloned());

        let mut command = self.command();
        command.args(&exec_args);
        let output = run_with_timeout(command, EXEC_TIMEOUT, "docker exec")
            .await
            .map_err(RuntimeError::Unavailable)?;
        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: result.stderr,
            });
        }
        Ok(result)
    }

    async fn list_managed(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        self.ps(format!("label={IMAGE_PREFIX}"), true).await
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
