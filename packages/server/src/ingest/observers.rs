use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::StatusUpdate;
use dashmap::DashMap;
use tracing::warn;

/// Callback invoked with every normalized event of the submission it was registered for.
pub type ResultCallback = Arc<dyn Fn(&StatusUpdate) + Send + Sync>;

/// Handle used to deregister a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// SubmissionId -> callbacks, internally synchronized.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    by_submission: DashMap<String, Vec<(ObserverId, ResultCallback)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub(crate) fn register(&self, submission_id: &str, callback: ResultCallback) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.by_submission
            .entry(submission_id.to_owned())
            .or_default()
            .push((id, callback));
        id
    }

    pub(crate) fn remove(&self, submission_id: &str, id: ObserverId) -> bool {
        let removed = match self.by_submission.get_mut(submission_id) {
            Some(mut callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|(existing, _)| *existing != id);
                callbacks.len() < before
            }
            None => false,
        };
        self.by_submission
            .remove_if(submission_id, |_, callbacks| callbacks.is_empty());
        removed
    }

    pub(crate) fn clear(&self, submission_id: &str) -> usize {
        self.by_submission
            .remove(submission_id)
            .map_or(0, |(_, callbacks)| callbacks.len())
    }

    pub(crate) fn count(&self, submission_id: &str) -> usize {
        self.by_submission
            .get(submission_id)
            .map_or(0, |callbacks| callbacks.len())
    }

    /// Invoke every callback for the update's submission. Returns how many ran to completion.
    ///
    /// Callbacks are cloned out first so none of them runs under the map lock.
    pub(crate) fn notify(&self, update: &StatusUpdate) -> usize {
        let callbacks: Vec<ResultCallback> = self
            .by_submission
            .get(&update.submission_id)
            .map(|entry| entry.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        callbacks
            .iter()
            .filter(|callback| {
                let outcome = catch_unwind(AssertUnwindSafe(|| callback(update)));
                if outcome.is_err() {
                    warn!(
                        submission_id = %update.submission_id,
                        "Result callback panicked; continuing with remaining observers"
                    );
                }
                outcome.is_ok()
            })
            .count()
    }
}
