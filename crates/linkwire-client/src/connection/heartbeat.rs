//! Periodic keep-alive timer.
//!
//! One task per running schedule. The first beat fires one full interval after
//! `start`; a beat that finds the link down is the callback's problem, the
//! schedule itself never retries or stops on its own.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub struct HeartbeatScheduler {
    interval: Duration,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatScheduler {
    pub fn new(interval: Duration, runtime: Handle) -> Self {
        Self {
            interval,
            runtime,
            task: Mutex::new(None),
        }
    }

    /// Start beating. Any schedule already running is cancelled first.
    pub fn start<F>(&self, beat: F)
    where
        F: Fn() + Send + 'static,
    {
        let every = self.interval;
        let first = Instant::now() + every;
        let handle = self.runtime.spawn(async move {
            let mut tick = tokio::time::interval_at(first, every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                beat();
            }
        });

        if let Some(prev) = self.task.lock().replace(handle) {
            prev.abort();
        }
        tracing::debug!(interval_ms = every.as_millis() as u64, "heartbeat started");
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("heartbeat stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
