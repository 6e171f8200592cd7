//! Bounded, fixed-delay reconnection.
//!
//! The attempt counter is bumped right before each retry fires and only goes
//! back to zero through `reset` (successful open) or `cancel` (explicit
//! disconnect). Once it reaches `max_attempts` further scheduling is refused.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct ReconnectScheduler {
    max_attempts: u32,
    delay: Duration,
    attempts: Arc<AtomicU32>,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectScheduler {
    pub fn new(max_attempts: u32, delay: Duration, runtime: Handle) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: Arc::new(AtomicU32::new(0)),
            runtime,
            task: Mutex::new(None),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Schedule `retry` after the fixed delay.
    ///
    /// Returns false when the attempt budget is exhausted; nothing is
    /// scheduled in that case.
    pub fn schedule<F>(&self, retry: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.attempts() >= self.max_attempts {
            tracing::error!(max = self.max_attempts, "reconnect limit reached, giving up");
            return false;
        }

        let deadline = Instant::now() + self.delay;
        let attempts = Arc::clone(&self.attempts);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(attempt, "reconnecting");
            retry();
        });

        if let Some(prev) = self.task.lock().replace(handle) {
            prev.abort();
        }
        tracing::info!(delay_ms = self.delay.as_millis() as u64, "reconnect scheduled");
        true
    }

    /// Cancel a pending retry and forget previous attempts.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Drop a pending retry but keep the attempt count.
    pub fn clear_pending(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Forget previous attempts (after a successful open).
    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ReconnectScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
