// src/debounce.rs
//! Trailing-edge debouncer running on the tokio timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::utils::lock;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delivers a value to `on_settle` once no newer value was pushed for
/// the whole delay. Dropping the debouncer cancels the pending timer.
pub struct Debouncer<T> {
    delay: Duration,
    on_settle: Arc<dyn Fn(T) + Send + Sync>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, on_settle: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            on_settle: Arc::new(on_settle),
            pending: Mutex::new(None),
        }
    }

    /// Restart the wait with `value`, superseding any pending one.
    /// Must be called from within a tokio runtime.
    pub fn push(&self, value: T) {
        let on_settle = Arc::clone(&self.on_settle);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_settle(value);
        });

        if let Some(previous) = lock(&self.pending).replace(handle) {
            trace!("Superseding pending debounced value");
            previous.abort();
        }
    }

    /// Drop the pending value, if any. Returns whether one was waiting.
    pub fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(handle) => {
                let was_waiting = !handle.is_finished();
                handle.abort();
                was_waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = match self.pending.get_mut() {
            Ok(pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}
