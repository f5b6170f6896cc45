// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool for simulator image builds.
//!
//! Submitters enqueue a request on a shared bounded queue and wait on a
//! single-use reply channel. A fixed set of workers drains the queue. On
//! shutdown the queue is closed to new requests; workers build everything
//! already queued and exit once it is empty. Submitters still waiting for
//! queue space see [`BuildError::PoolClosed`].

use crate::files::{copy_path, remove_dir_if_exists};
use parking_lot::Mutex;
use sim_adapters::{BuildSpec, RuntimeAdapter, RuntimeError};
use sim_core::{image_tag, InstanceName, BUNDLE_LABEL};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Errors returned to a build submitter
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("pool closed")]
    PoolClosed,
    #[error("failed to prepare build context for {instance}: {message}")]
    Context { instance: String, message: String },
    #[error("failed to build image for {instance}: {source}")]
    Runtime {
        instance: String,
        #[source]
        source: RuntimeError,
    },
}

/// Pool sizing and scratch location
#[derive(Debug, Clone)]
pub struct BuildPoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub build_dir: PathBuf,
}

struct BuildRequest {
    instance: InstanceName,
    bundle_path: PathBuf,
    base_image: String,
    reply: oneshot::Sender<Result<(), BuildError>>,
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<BuildRequest>>>;

/// Fixed-size pool of image build workers.
pub struct BuildWorkerPool {
    tx: mpsc::Sender<BuildRequest>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl BuildWorkerPool {
    /// Spawn the workers. Must be called within a tokio runtime.
    pub fn start<R: RuntimeAdapter>(runtime: R, config: BuildPoolConfig) -> Self {
        let worker_count = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (1..=worker_count)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    runtime.clone(),
                    config.build_dir.clone(),
                    Arc::clone(&queue),
                    shutdown.subscribe(),
                ))
            })
            .collect();
        info!(
            workers = worker_count,
            queue = config.queue_capacity,
            "started image build workers"
        );

        Self {
            tx,
            closed: AtomicBool::new(false),
            shutdown,
            workers: Mutex::new(workers),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Build `sim-cli-managed:<instance>` from a bundle, waiting for the result.
    ///
    /// Blocks while the queue is full. Fails with `PoolClosed` once shutdown
    /// has begun, including while waiting for queue space.
    pub async fn submit(
        &self,
        instance: &InstanceName,
        bundle_path: &Path,
        base_image: &str,
    ) -> Result<(), BuildError> {
        if self.is_closed() {
            return Err(BuildError::PoolClosed);
        }

        let (reply, result) = oneshot::channel();
        let request = BuildRequest {
            instance: instance.clone(),
            bundle_path: bundle_path.to_path_buf(),
            base_image: base_image.to_string(),
            reply,
        };

        info!(instance = %instance, "submitting image build request");
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            sent = self.tx.send(request) => {
                if sent.is_err() {
                    return Err(BuildError::PoolClosed);
                }
            }
            _ = shutdown.wait_for(|closed| *closed) => return Err(BuildError::PoolClosed),
        }

        // A dropped reply means the request never reached a worker.
        result.await.unwrap_or(Err(BuildError::PoolClosed))
    }

    /// Stop accepting work and wait for every worker to exit.
    ///
    /// Every request admitted to the queue before this call is built.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down image build workers");
        self.shutdown.send_replace(true);

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "build worker ended abnormally");
            }
        }
        info!("all image build workers stopped");
    }
}

enum Next {
    Request(Option<BuildRequest>),
    Drain,
}

async fn worker_loop<R: RuntimeAdapter>(
    id: usize,
    runtime: R,
    build_dir: PathBuf,
    queue: SharedQueue,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker = id, "image build worker started");
    let mut draining = false;
    loop {
        // Queued work wins over the shutdown signal.
        let next = tokio::select! {
            biased;
            request = async { queue.lock().await.recv().await } => Next::Request(request),
            _ = shutdown.wait_for(|closed| *closed), if !draining => Next::Drain,
        };
        let request = match next {
            Next::Request(Some(request)) => request,
            Next::Request(None) => break,
            Next::Drain => {
                // Closed receiver yields what is buffered, then None.
                draining = true;
                queue.lock().await.close();
                continue;
            }
        };

        let BuildRequest {
            instance,
            bundle_path,
            base_image,
            reply,
        } = request;
        info!(worker = id, instance = %instance, bundle = %bundle_path.display(), "processing build request");

        let result = build_image(&runtime, &build_dir, &instance, &bundle_path, &base_image).await;
        match &result {
            Ok(()) => info!(instance = %instance, "image build completed"),
            Err(e) => error!(instance = %instance, error = %e, "image build failed"),
        }
        // Submitter may have gone away
        let _ = reply.send(result);
    }
    info!(worker = id, "image build worker shutting down");
}

/// Build one image from a private context directory, removed afterwards.
async fn build_image<R: RuntimeAdapter>(
    runtime: &R,
    build_dir: &Path,
    instance: &InstanceName,
    bundle_path: &Path,
    base_image: &str,
) -> Result<(), BuildError> {
    let context_dir = build_dir.join(format!("{}-{}", instance, Uuid::new_v4().simple()));

    let result = async {
        let ctx = context_dir.clone();
        let bundle = bundle_path.to_path_buf();
        let base = base_image.to_string();
        let prepared = tokio::task::spawn_blocking(move || prepare_context(&ctx, &bundle, &base))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));
        if let Err(message) = prepared {
            return Err(BuildError::Context {
                instance: instance.to_string(),
                message,
            });
        }

        let spec = BuildSpec {
            tag: image_tag(instance),
            context_dir: context_dir.clone(),
            labels: vec![(BUNDLE_LABEL.to_string(), instance.to_string())],
        };
        runtime
            .build(&spec)
            .await
            .map_err(|source| BuildError::Runtime {
                instance: instance.to_string(),
                source,
            })
    }
    .await;

    if let Err(e) = remove_dir_if_exists(&context_dir) {
        warn!(path = %context_dir.display(), error = %e, "failed to remove build context");
    }
    result
}

/// Dockerfile layering the bundle onto the base image.
pub(crate) fn dockerfile(base_image: &str) -> String {
    format!("FROM {base_image}\nCOPY bundle /bundle\n")
}

/// Write `Dockerfile` and copy the bundle to `<dir>/bundle`.
pub(crate) fn prepare_context(dir: &Path, bundle_path: &Path, base_image: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("Dockerfile"), dockerfile(base_image))?;
    copy_path(bundle_path, &dir.join("bundle"))?;
    Ok(())
}

#[cfg(test)]
#[path = "build_pool_tests.rs"]
mod tests;
