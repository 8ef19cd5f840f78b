//! A restartable delayed task.
//!
//! Scheduling replaces whatever was pending: the previous task is aborted
//! before it fires, so only the most recent call within the quiet period
//! runs.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` once the delay elapses, aborting any pending task.
    ///
    /// Outside a tokio runtime there is no timer to wait on, so `task` runs
    /// immediately on the calling thread.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        match Handle::try_current() {
            Ok(handle) => {
                let delay = self.delay;
                *pending = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                }));
            }
            Err(_) => {
                drop(pending);
                tracing::warn!("no tokio runtime available, running immediately");
                task();
            }
        }
    }

    /// Abort the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
