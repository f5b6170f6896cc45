// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-bounded polling for `sim start --wait`.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// Why the wait between two polls ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Tick {
    /// Poll again.
    Again,
    /// The deadline passed.
    Expired,
    /// Ctrl+C.
    Interrupted,
}

pub struct Poller {
    interval: Duration,
    started: Instant,
    deadline: Instant,
    polls: u32,
    ctrl_c: Pin<Box<dyn Future<Output = std::io::Result<()>>>>,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            interval,
            started,
            deadline: started + timeout,
            polls: 0,
            ctrl_c: Box::pin(tokio::signal::ctrl_c()),
        }
    }

    /// Sleep until the next poll. The sleep is cut short at the deadline,
    /// so a long interval never overshoots the timeout.
    pub async fn tick(&mut self) -> Tick {
        let now = Instant::now();
        if now >= self.deadline {
            return Tick::Expired;
        }
        let nap = self.interval.min(self.deadline - now);

        tokio::select! {
            _ = &mut self.ctrl_c => Tick::Interrupted,
            _ = tokio::time::sleep(nap) => {
                if Instant::now() >= self.deadline {
                    Tick::Expired
                } else {
                    self.polls += 1;
                    Tick::Again
                }
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Completed waits so far
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
