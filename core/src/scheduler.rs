//! Repeating timer behind the polling controls.
//!
//! # Design
//! `PollScheduler` walks `Idle -> Armed -> Running -> Idle`. Arming only
//! opens the interval prompt; the timer exists only while `Running`, and it
//! is owned by a `TaskHandle` that aborts the task when cancelled or
//! dropped. Each tick bumps the counter and calls the tick callback. The
//! callback is expected to spawn its work, so ticks are never skipped or
//! coalesced while earlier calls are still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::error::ProbeError;
use crate::types::PollState;

pub const MIN_INTERVAL_MS: u64 = 50;
pub const DEFAULT_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    /// Waiting for the user to confirm an interval.
    Armed,
    Running,
}

impl PollPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollPhase::Idle => "idle",
            PollPhase::Armed => "armed",
            PollPhase::Running => "running",
        }
    }
}

/// Owns a spawned task. Cancelling is idempotent; dropping cancels.
#[derive(Debug)]
pub struct TaskHandle {
    inner: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn `task` on the current tokio runtime.
    pub fn spawn<F>(task: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            inner: Some(tokio::spawn(task)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
pub struct PollScheduler {
    phase: PollPhase,
    interval_ms: u64,
    count: Arc<AtomicU64>,
    task: Option<TaskHandle>,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            phase: PollPhase::Idle,
            interval_ms: DEFAULT_INTERVAL_MS,
            count: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == PollPhase::Running
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Ticks since polling last started running.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PollState {
        PollState {
            enabled: self.is_running(),
            interval_ms: self.interval_ms,
            count: self.count(),
        }
    }

    /// Change the interval. Not allowed while a timer is running.
    pub fn set_interval(&mut self, interval_ms: u64) -> Result<(), ProbeError> {
        if self.is_running() {
            return Err(self.transition_error("change the interval"));
        }
        self.interval_ms = interval_ms;
        Ok(())
    }

    pub fn check_interval(&self) -> Result<(), ProbeError> {
        if self.interval_ms < MIN_INTERVAL_MS {
            return Err(ProbeError::IntervalTooShort(self.interval_ms));
        }
        Ok(())
    }

    /// Idle -> Armed. Arming twice is harmless.
    pub fn arm(&mut self) -> Result<(), ProbeError> {
        match self.phase {
            PollPhase::Idle | PollPhase::Armed => {
                self.phase = PollPhase::Armed;
                Ok(())
            }
            PollPhase::Running => Err(self.transition_error("arm polling")),
        }
    }

    /// Armed -> Idle without ever starting a timer.
    pub fn cancel_arm(&mut self) -> Result<(), ProbeError> {
        match self.phase {
            PollPhase::Idle | PollPhase::Armed => {
                self.phase = PollPhase::Idle;
                Ok(())
            }
            PollPhase::Running => Err(self.transition_error("cancel the interval prompt")),
        }
    }

    /// Armed -> Running. Resets the counter and starts the timer; the first
    /// tick fires one interval from now. Must be called inside a tokio
    /// runtime.
    ///
    /// An interval below `MIN_INTERVAL_MS` is rejected and the scheduler
    /// stays armed.
    pub fn start<F>(&mut self, mut on_tick: F) -> Result<(), ProbeError>
    where
        F: FnMut(u64) + Send + 'static,
    {
        if self.phase != PollPhase::Armed {
            return Err(self.transition_error("start polling"));
        }
        self.check_interval()?;

        self.count.store(0, Ordering::SeqCst);
        let count = Arc::clone(&self.count);
        let period = Duration::from_millis(self.interval_ms);
        self.task = Some(TaskHandle::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let tick = count.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(tick, "poll tick");
                on_tick(tick);
            }
        }));
        self.phase = PollPhase::Running;
        info!(interval_ms = self.interval_ms, "polling started");
        Ok(())
    }

    /// Back to Idle from any phase, tearing down the timer if there is one.
    /// Returns whether a timer was running. Safe to call repeatedly.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
        self.phase = PollPhase::Idle;
        if was_running {
            info!(ticks = self.count(), "polling stopped");
        }
        was_running
    }

    fn transition_error(&self, action: &'static str) -> ProbeError {
        ProbeError::InvalidTransition {
            action,
            phase: self.phase.as_str(),
        }
    }
}
