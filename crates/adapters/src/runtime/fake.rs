// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake runtime adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    BuildSpec, ContainerSpec, ContainerSummary, ExecOutput, ImageSummary, LogStream, PortMapping,
    RuntimeAdapter, RuntimeError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use sim_core::{image_tag, InstanceName, IMAGE_PREFIX};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const LOG_BUFFER: usize = 1024;
const FIRST_HOST_PORT: u16 = 49153;

/// Runtime operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    FindContainers,
    CreateAndStart,
    Start,
    Stop,
    Remove,
    Build,
    FindImages,
    RemoveImages,
    ReadFile,
    TailLogs,
    Exec,
    ListManaged,
}

/// Recorded runtime call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    FindContainers { name: String, include_stopped: bool },
    CreateAndStart { spec: ContainerSpec },
    Start { id: String },
    Stop { name: String },
    Remove { name: String },
    Build { spec: BuildSpec },
    FindImages { name: String },
    RemoveImages { name: String },
    ReadFile { name: String, path: String },
    TailLogs { name: String },
    Exec { name: String, cmd: Vec<String>, env: Vec<(String, String)> },
    ListManaged,
}

impl RuntimeCall {
    pub fn op(&self) -> RuntimeOp {
        match self {
            RuntimeCall::FindContainers { .. } => RuntimeOp::FindContainers,
            RuntimeCall::CreateAndStart { .. } => RuntimeOp::CreateAndStart,
            RuntimeCall::Start { .. } => RuntimeOp::Start,
            RuntimeCall::Stop { .. } => RuntimeOp::Stop,
            RuntimeCall::Remove { .. } => RuntimeOp::Remove,
            RuntimeCall::Build { .. } => RuntimeOp::Build,
            RuntimeCall::FindImages { .. } => RuntimeOp::FindImages,
            RuntimeCall::RemoveImages { .. } => RuntimeOp::RemoveImages,
            RuntimeCall::ReadFile { .. } => RuntimeOp::ReadFile,
            RuntimeCall::TailLogs { .. } => RuntimeOp::TailLogs,
            RuntimeCall::Exec { .. } => RuntimeOp::Exec,
            RuntimeCall::ListManaged => RuntimeOp::ListManaged,
        }
    }
}

/// Fake container state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub running: bool,
    pub labels: Vec<(String, String)>,
    pub exposed_port: u16,
    pub host_port: u16,
}

impl FakeContainer {
    fn summary(&self) -> ContainerSummary {
        let ports = if self.running {
            vec![PortMapping {
                host_ip: "0.0.0.0".to_string(),
                host_port: self.host_port,
                container_port: self.exposed_port,
                protocol: "tcp".to_string(),
            }]
        } else {
            Vec::new()
        };
        ContainerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            state: if self.running { "running" } else { "exited" }.to_string(),
            status: if self.running {
                "Up 1 second".to_string()
            } else {
                "Exited (137) 1 second ago".to_string()
            },
            ports,
            labels: self.labels.clone(),
        }
    }
}

#[derive(Default)]
struct LogFeed {
    backlog: Vec<Result<String, RuntimeError>>,
    subscribers: Vec<mpsc::Sender<Result<String, RuntimeError>>>,
    ended: bool,
}

struct Failure {
    op: RuntimeOp,
    name: Option<String>,
    error: RuntimeError,
}

#[derive(Default)]
struct FakeRuntimeState {
    containers: Vec<FakeContainer>,
    images: Vec<ImageSummary>,
    files: HashMap<(String, String), Vec<u8>>,
    logs: HashMap<String, LogFeed>,
    exec_output: ExecOutput,
    failures: Vec<Failure>,
    calls: Vec<RuntimeCall>,
    build_delay: Option<Duration>,
    builds_in_flight: usize,
    max_builds_in_flight: usize,
    next_id: u64,
}

impl FakeRuntimeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn check(&self, op: RuntimeOp, name: &str) -> Result<(), RuntimeError> {
        match self
            .failures
            .iter()
            .find(|f| f.op == op && f.name.as_deref().map_or(true, |n| n == name))
        {
            Some(f) => Err(f.error.clone()),
            None => Ok(()),
        }
    }

    fn matching(&self, name: &str, include_stopped: bool) -> Vec<ContainerSummary> {
        self.containers
            .iter()
            .filter(|c| c.name == name && (include_stopped || c.running))
            .map(FakeContainer::summary)
            .collect()
    }

    fn only_running(&self, name: &str) -> Result<ContainerSummary, RuntimeError> {
        let mut running = self.matching(name, false);
        match running.len() {
            0 => Err(RuntimeError::NotFound(name.to_string())),
            1 => Ok(running.remove(0)),
            count => Err(RuntimeError::Ambiguous {
                name: name.to_string(),
                count,
            }),
        }
    }
}

/// In-memory runtime adapter for tests
#[derive(Clone, Default)]
pub struct FakeRuntimeAdapter {
    inner: Arc<Mutex<FakeRuntimeState>>,
}

impl std::fmt::Debug for FakeRuntimeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("FakeRuntimeAdapter")
            .field("containers", &state.containers.len())
            .field("calls", &state.calls.len())
            .finish_non_exhaustive()
    }
}

impl FakeRuntimeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of recorded calls of one kind
    pub fn call_count(&self, op: RuntimeOp) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.inner.lock().containers.clone()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.inner
            .lock()
            .containers
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn images(&self) -> Vec<ImageSummary> {
        self.inner.lock().images.clone()
    }

    /// Whether an image tagged for `instance` exists.
    pub fn has_image(&self, instance: &str) -> bool {
        let tag = image_tag(&InstanceName::new(instance));
        self.inner.lock().images.iter().any(|i| i.reference == tag)
    }

    /// Add a pre-existing image for `instance`.
    pub fn add_image(&self, instance: &str) {
        let mut inner = self.inner.lock();
        let id = inner.next_id("sha256:image");
        inner.images.push(ImageSummary {
            id,
            reference: image_tag(&InstanceName::new(instance)),
        });
    }

    /// Add a pre-existing managed container, returning its ID.
    pub fn add_container(&self, name: &str, running: bool) -> String {
        let mut inner = self.inner.lock();
        let id = inner.next_id("container");
        let host_port = FIRST_HOST_PORT + inner.containers.len() as u16;
        inner.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image_tag(&InstanceName::new(name)),
            running,
            labels: vec![(IMAGE_PREFIX.to_string(), name.to_string())],
            exposed_port: sim_core::SIMULATOR_API_PORT,
            host_port,
        });
        id
    }

    /// Mark every container named `name` as exited.
    pub fn set_exited(&self, name: &str) {
        for c in self
            .inner
            .lock()
            .containers
            .iter_mut()
            .filter(|c| c.name == name)
        {
            c.running = false;
        }
    }

    /// Make `read_file` return `content` for `path` in container `name`.
    pub fn set_file(&self, name: &str, path: &str, content: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .files
            .insert((name.to_string(), path.to_string()), content.into());
    }

    /// Output returned by successful `exec` calls
    pub fn set_exec_output(&self, stdout: &str, stderr: &str) {
        self.inner.lock().exec_output = ExecOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
    }

    /// Fail every `op` call with `error` until cleared.
    pub fn fail(&self, op: RuntimeOp, error: RuntimeError) {
        self.inner.lock().failures.push(Failure {
            op,
            name: None,
            error,
        });
    }

    /// Fail `op` calls targeting `name` only.
    pub fn fail_for(&self, op: RuntimeOp, name: &str, error: RuntimeError) {
        self.inner.lock().failures.push(Failure {
            op,
            name: Some(name.to_string()),
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failures.clear();
    }

    /// Delay each build, to observe concurrency and backpressure.
    pub fn set_build_delay(&self, delay: Duration) {
        self.inner.lock().build_delay = Some(delay);
    }

    /// Highest number of builds observed running at once.
    pub fn max_concurrent_builds(&self) -> usize {
        self.inner.lock().max_builds_in_flight
    }

    /// Deliver a log line to followers of `name`, or queue it for the next one.
    pub fn push_log_line(&self, name: &str, line: &str) {
        self.push_log(name, Ok(line.to_string()));
    }

    /// Deliver a read failure to followers of `name`.
    pub fn push_log_error(&self, name: &str, error: RuntimeError) {
        self.push_log(name, Err(error));
    }

    /// End the log stream of `name`, as when the container exits.
    pub fn end_logs(&self, name: &str) {
        let mut inner = self.inner.lock();
        let feed = inner.logs.entry(name.to_string()).or_default();
        feed.ended = true;
        feed.subscribers.clear();
    }

    /// Number of open log followers for `name`.
    pub fn log_followers(&self, name: &str) -> usize {
        let mut inner = self.inner.lock();
        match inner.logs.get_mut(name) {
            Some(feed) => {
                feed.subscribers.retain(|tx| !tx.is_closed());
                feed.subscribers.len()
            }
            None => 0,
        }
    }

    fn push_log(&self, name: &str, item: Result<String, RuntimeError>) {
        let mut inner = self.inner.lock();
        let feed = inner.logs.entry(name.to_string()).or_default();
        feed.subscribers.retain(|tx| !tx.is_closed());
        if feed.subscribers.is_empty() {
            feed.backlog.push(item);
            return;
        }
        for tx in &feed.subscribers {
            let _ = tx.try_send(item.clone());
        }
    }
}

#[async_trait]
impl RuntimeAdapter for FakeRuntimeAdapter {
    async fn find_containers(
        &self,
        name: &str,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::FindContainers {
            name: name.to_string(),
            include_stopped,
        });
        inner.check(RuntimeOp::FindContainers, name)?;
        Ok(inner.matching(name, include_stopped))
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::CreateAndStart { spec: spec.clone() });
        inner.check(RuntimeOp::CreateAndStart, &spec.name)?;

        if !inner.images.iter().any(|i| i.reference == spec.image) {
            return Err(RuntimeError::CommandFailed {
                code: 125,
                stderr: format!("Unable to find image '{}' locally", spec.image),
            });
        }
        if inner.containers.iter().any(|c| c.name == spec.name) {
            return Err(RuntimeError::CommandFailed {
                code: 125,
                stderr: format!(
                    "Conflict. The container name \"/{}\" is already in use",
                    spec.name
                ),
            });
        }

        let id = inner.next_id("container");
        let host_port = FIRST_HOST_PORT + inner.containers.len() as u16;
        inner.containers.push(FakeContainer {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            running: true,
            labels: spec.labels.clone(),
            exposed_port: spec.exposed_port,
            host_port,
        });
        // A fresh container starts a fresh log
        if let Some(feed) = inner.logs.get_mut(&spec.name) {
            feed.ended = false;
        }
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Start {
            id: container_id.to_string(),
        });
        inner.check(RuntimeOp::Start, container_id)?;
        let Some(container) = inner.containers.iter_mut().find(|c| c.id == container_id) else {
            return Err(RuntimeError::CommandFailed {
                code: 1,
                stderr: format!("No such container: {container_id}"),
            });
        };
        container.running = true;
        let name = container.name.clone();
        if let Some(feed) = inner.logs.get_mut(&name) {
            feed.ended = false;
        }
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Stop {
            name: name.to_string(),
        });
        inner.check(RuntimeOp::Stop, name)?;
        for c in inner.containers.iter_mut().filter(|c| c.name == name) {
            c.running = false;
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Remove {
            name: name.to_string(),
        });
        inner.check(RuntimeOp::Remove, name)?;
        inner.containers.retain(|c| c.name != name);
        Ok(())
    }

    async fn build(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push(RuntimeCall::Build { spec: spec.clone() });
            let target = spec
                .tag
                .strip_prefix(IMAGE_PREFIX)
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(&spec.tag);
            inner.check(RuntimeOp::Build, target)?;
            inner.builds_in_flight += 1;
            inner.max_builds_in_flight = inner.max_builds_in_flight.max(inner.builds_in_flight);
            inner.build_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        inner.builds_in_flight -= 1;
        if !inner.images.iter().any(|i| i.reference == spec.tag) {
            let id = inner.next_id("sha256:image");
            inner.images.push(ImageSummary {
                id,
                reference: spec.tag.clone(),
            });
        }
        Ok(())
    }

    async fn find_images(&self, name: &str) -> Result<Vec<ImageSummary>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::FindImages {
            name: name.to_string(),
        });
        inner.check(RuntimeOp::FindImages, name)?;
        let tag = image_tag(&InstanceName::new(name));
        Ok(inner
            .images
            .iter()
            .filter(|i| i.reference == tag)
            .cloned()
            .collect())
    }

    async fn remove_images(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::RemoveImages {
            name: name.to_string(),
        });
        inner.check(RuntimeOp::RemoveImages, name)?;
        let tag = image_tag(&InstanceName::new(name));
        inner.images.retain(|i| i.reference != tag);
        Ok(())
    }

    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::ReadFile {
            name: name.to_string(),
            path: path.to_string(),
        });
        inner.check(RuntimeOp::ReadFile, name)?;
        inner.only_running(name)?;
        inner
            .files
            .get(&(name.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| RuntimeError::CommandFailed {
                code: 1,
                stderr: format!("cat: {path}: No such file or directory"),
            })
    }

    async fn tail_logs(&self, name: &str) -> Result<LogStream, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::TailLogs {
            name: name.to_string(),
        });
        inner.check(RuntimeOp::TailLogs, name)?;
        inner.only_running(name)?;

        let (tx, stream) = LogStream::channel(LOG_BUFFER);
        let feed = inner.logs.entry(name.to_string()).or_default();
        for item in feed.backlog.drain(..) {
            let _ = tx.try_send(item);
        }
        if !feed.ended {
            feed.subscribers.push(tx);
        }
        Ok(stream)
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        env: &[(String, String)],
    ) -> Result<ExecOutput, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Exec {
            name: name.to_string(),
            cmd: cmd.to_vec(),
            env: env.to_vec(),
        });
        inner.check(RuntimeOp::Exec, name)?;
        inner.only_running(name)?;
        Ok(inner.exec_output.clone())
    }

    async fn list_managed(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::ListManaged);
        inner.check(RuntimeOp::ListManaged, "")?;
        Ok(inner
            .containers
            .iter()
            .filter(|c| c.labels.iter().any(|(k, _)| k == IMAGE_PREFIX))
            .map(FakeContainer::summary)
            .collect())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
