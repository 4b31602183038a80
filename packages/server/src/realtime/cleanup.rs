use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::AbortHandle;

/// Keyed delayed tasks. Scheduling a key again replaces (and aborts) its pending task.
#[derive(Debug, Default)]
pub struct CleanupScheduler {
    pending: Arc<DashMap<String, (u64, AbortHandle)>>,
    next_ticket: AtomicU64,
}

impl CleanupScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless cancelled or rescheduled first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: &str, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.to_owned();

        // The entry guard is held until the handle is stored so the task cannot
        // look itself up before it is registered.
        let entry = self.pending.entry(key.to_owned());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = pending
                .remove_if(&task_key, |_, (owner, _)| *owner == ticket)
                .is_some();
            if current {
                task();
            }
        })
        .abort_handle();

        match entry {
            Entry::Occupied(mut occupied) => {
                let (_, previous) = occupied.insert((ticket, handle));
                previous.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert((ticket, handle));
            }
        }
    }

    /// Returns true if a pending task was cancelled.
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, (_, handle))) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let keys: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|key| self.cancel(key)).count()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
