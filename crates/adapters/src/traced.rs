// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::runtime::{
    BuildSpec, ContainerSpec, ContainerSummary, ExecOutput, ImageSummary, LogStream,
    RuntimeAdapter, RuntimeError,
};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any RuntimeAdapter
#[derive(Clone)]
pub struct TracedRuntime<R> {
    inner: R,
}

impl<R> TracedRuntime<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: RuntimeAdapter> RuntimeAdapter for TracedRuntime<R> {
    async fn find_containers(
        &self,
        name: &str,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let result = self.inner.find_containers(name, include_stopped).await;
        tracing::trace!(name, include_stopped, found = ?result.as_ref().map(Vec::len).ok(), "checked");
        result
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        async {
            tracing::info!(image = %spec.image, port = spec.exposed_port, "starting");
            let start = std::time::Instant::now();
            let result = self.inner.create_and_start(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(id) => tracing::info!(container_id = id.as_str(), elapsed_ms, "container created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.create", name = %spec.name))
        .await
    }

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError> {
        let result = self.inner.start(container_id).await;
        tracing::info_span!("runtime.start", container_id).in_scope(|| match &result {
            Ok(()) => tracing::info!("started"),
            Err(e) => tracing::error!(error = %e, "start failed"),
        });
        result
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        let result = self.inner.stop(name).await;
        tracing::info_span!("runtime.stop", name).in_scope(|| match &result {
            Ok(()) => tracing::info!("stopped"),
            Err(e) => tracing::warn!(error = %e, "stop failed (may be expected)"),
        });
        result
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let result = self.inner.remove(name).await;
        tracing::info_span!("runtime.remove", name).in_scope(|| match &result {
            Ok(()) => tracing::info!("removed"),
            Err(e) => tracing::warn!(error = %e, "remove failed (may be expected)"),
        });
        result
    }

    async fn build(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        async {
            tracing::info!(context = %spec.context_dir.display(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.build(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "image built"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "build failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.build", tag = %spec.tag))
        .await
    }

    async fn find_images(&self, name: &str) -> Result<Vec<ImageSummary>, RuntimeError> {
        let result = self.inner.find_images(name).await;
        tracing::trace!(name, found = ?result.as_ref().map(Vec::len).ok(), "checked images");
        result
    }

    async fn remove_images(&self, name: &str) -> Result<(), RuntimeError> {
        let result = self.inner.remove_images(name).await;
        tracing::info_span!("runtime.remove_images", name).in_scope(|| match &result {
            Ok(()) => tracing::info!("images removed"),
            Err(e) => tracing::warn!(error = %e, "image removal failed (may be expected)"),
        });
        result
    }

    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        let result = self.inner.read_file(name, path).await;
        tracing::info_span!("runtime.read_file", name, path).in_scope(|| match &result {
            Ok(bytes) => tracing::debug!(len = bytes.len(), "read"),
            Err(e) => tracing::warn!(error = %e, "read failed"),
        });
        result
    }

    async fn tail_logs(&self, name: &str) -> Result<LogStream, RuntimeError> {
        let result = self.inner.tail_logs(name).await;
        tracing::info_span!("runtime.logs", name).in_scope(|| match &result {
            Ok(_) => tracing::debug!("following"),
            Err(e) => tracing::error!(error = %e, "follow failed"),
        });
        result
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        env: &[(String, String)],
    ) -> Result<ExecOutput, RuntimeError> {
        async {
            tracing::info!(argc = cmd.len(), env_count = env.len(), "running");
            let start = std::time::Instant::now();
            let result = self.inner.exec(name, cmd, env).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(out) => tracing::info!(elapsed_ms, stdout_len = out.stdout.len(), "exec done"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "exec failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.exec", name))
        .await
    }

    async fn list_managed(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let result = self.inner.list_managed().await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "list managed failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
