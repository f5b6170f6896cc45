// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness monitoring.
//!
//! A monitor follows one instance's logs until the sentinel line shows up,
//! then flips the version's `ready` flag in the store and exits. Monitors
//! are tracked per instance so a repeated start does not pile up watchers.

use parking_lot::Mutex;
use sim_adapters::RuntimeAdapter;
use sim_core::{InstanceName, VersionId, WorkspaceName};
use sim_storage::MetadataStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// How a monitor finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Sentinel seen; version marked ready.
    Ready,
    /// Log stream closed before the sentinel.
    StreamEnded,
    /// Following the logs failed.
    Failed(String),
    /// Shut down before finishing.
    Cancelled,
}

/// The version a monitor is watching for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTarget {
    pub workspace: WorkspaceName,
    pub version: VersionId,
    pub instance: InstanceName,
}

/// Follows instance logs for a sentinel and records readiness.
#[derive(Clone)]
pub struct ReadinessMonitor<R> {
    runtime: R,
    store: Arc<MetadataStore>,
    sentinel: String,
}

impl<R: RuntimeAdapter> ReadinessMonitor<R> {
    pub fn new(runtime: R, store: Arc<MetadataStore>, sentinel: impl Into<String>) -> Self {
        Self {
            runtime,
            store,
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Watch until the sentinel, the end of the stream, or cancellation.
    pub async fn watch(
        &self,
        target: &ReadinessTarget,
        mut cancel: watch::Receiver<bool>,
    ) -> MonitorOutcome {
        let followed = tokio::select! {
            biased;
            _ = cancel.wait_for(|stop| *stop) => return MonitorOutcome::Cancelled,
            stream = self.runtime.tail_logs(target.instance.as_str()) => stream,
        };
        let mut stream = match followed {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "cannot follow simulator logs");
                return MonitorOutcome::Failed(e.to_string());
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.wait_for(|stop| *stop) => return MonitorOutcome::Cancelled,
                line = stream.next_line() => line,
            };
            match next {
                Some(Ok(line)) if line.contains(&self.sentinel) => {
                    self.mark_ready(target);
                    return MonitorOutcome::Ready;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "log stream failed before readiness");
                    return MonitorOutcome::Failed(e.to_string());
                }
                None => {
                    info!("log stream ended before readiness");
                    return MonitorOutcome::StreamEnded;
                }
            }
        }
    }

    fn mark_ready(&self, target: &ReadinessTarget) {
        match self.store.set_version_ready(
            target.workspace.as_str(),
            target.version.as_str(),
            true,
        ) {
            Ok(true) => info!("simulator ready"),
            Ok(false) => debug!("version already marked ready"),
            // Version deleted mid-watch
            Err(e) if e.is_not_found() => debug!(error = %e, "version gone, not marking ready"),
            Err(e) => error!(error = %e, "failed to mark version ready"),
        }
    }
}

/// Live monitors keyed by instance, sharing one cancellation signal.
pub struct MonitorRegistry {
    monitors: Mutex<HashMap<InstanceName, JoinHandle<MonitorOutcome>>>,
    cancel: watch::Sender<bool>,
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRegistry {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            monitors: Mutex::new(HashMap::new()),
            cancel,
        }
    }

    /// Spawn a monitor for `target` unless a live one already exists.
    ///
    /// Returns whether a new monitor was spawned.
    pub fn ensure<R: RuntimeAdapter>(
        &self,
        monitor: &ReadinessMonitor<R>,
        target: ReadinessTarget,
    ) -> bool {
        if *self.cancel.borrow() {
            return false;
        }
        let mut monitors = self.monitors.lock();
        monitors.retain(|_, handle| !handle.is_finished());
        if monitors
            .get(&target.instance)
            .is_some_and(|handle| !handle.is_finished())
        {
            debug!(instance = %target.instance, "readiness monitor already running");
            return false;
        }

        let monitor = monitor.clone();
        let cancel = self.cancel.subscribe();
        let span = tracing::info_span!("readiness", instance = %target.instance);
        let instance = target.instance.clone();
        let handle = tokio::spawn(
            async move {
                info!(sentinel = monitor.sentinel(), "waiting for simulator readiness");
                monitor.watch(&target, cancel).await
            }
            .instrument(span),
        );
        monitors.insert(instance, handle);
        true
    }

    /// Whether a monitor for `instance` is still running.
    pub fn is_active(&self, instance: &str) -> bool {
        self.monitors
            .lock()
            .get(instance)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Detach the monitor for `instance`, to await its outcome.
    pub fn take(&self, instance: &str) -> Option<JoinHandle<MonitorOutcome>> {
        self.monitors.lock().remove(instance)
    }

    /// Entries held, finished or not.
    #[cfg(test)]
    pub(crate) fn tracked_count(&self) -> usize {
        self.monitors.lock().len()
    }

    pub fn active_count(&self) -> usize {
        self.monitors
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Cancel every monitor and wait for them to exit.
    pub async fn shutdown(&self) {
        self.cancel.send_replace(true);
        let handles: Vec<_> = self.monitors.lock().drain().collect();
        for (instance, handle) in handles {
            match handle.await {
                Ok(outcome) => debug!(instance = %instance, ?outcome, "readiness monitor stopped"),
                Err(e) => warn!(instance = %instance, error = %e, "readiness monitor ended abnormally"),
            }
        }
    }
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
