use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// A unique identifier for a single realtime connection.
pub type ConnectionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
    /// The connection is not registered (never opened, or already closed).
    UnknownConnection,
}

/// Many-to-many index between connections and the submissions they watch.
///
/// Both directions live behind one lock, so a pair is always present in both or
/// in neither.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Index>,
}

#[derive(Debug, Default)]
struct Index {
    by_connection: HashMap<ConnectionId, HashSet<String>>,
    by_submission: HashMap<String, HashSet<ConnectionId>>,
    pairs: usize,
}

impl Index {
    fn unlink(&mut self, connection_id: ConnectionId, submission_id: &str) {
        if let Some(watchers) = self.by_submission.get_mut(submission_id) {
            watchers.remove(&connection_id);
            if watchers.is_empty() {
                self.by_submission.remove(submission_id);
            }
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a connection eligible for subscriptions. Idempotent.
    pub fn register_connection(&self, connection_id: ConnectionId) {
        self.lock().by_connection.entry(connection_id).or_default();
    }

    pub fn subscribe(&self, connection_id: ConnectionId, submission_id: &str) -> SubscribeOutcome {
        let mut index = self.lock();
        let Some(watching) = index.by_connection.get_mut(&connection_id) else {
            return SubscribeOutcome::UnknownConnection;
        };
        if !watching.insert(submission_id.to_owned()) {
            return SubscribeOutcome::AlreadySubscribed;
        }
        index
            .by_submission
            .entry(submission_id.to_owned())
            .or_default()
            .insert(connection_id);
        index.pairs += 1;
        SubscribeOutcome::Added
    }

    /// Returns true if the pair existed.
    pub fn unsubscribe(&self, connection_id: ConnectionId, submission_id: &str) -> bool {
        let mut index = self.lock();
        let removed = index
            .by_connection
            .get_mut(&connection_id)
            .is_some_and(|watching| watching.remove(submission_id));
        if removed {
            index.unlink(connection_id, submission_id);
            index.pairs -= 1;
        }
        removed
    }

    /// Point-in-time snapshot of the connections watching a submission.
    pub fn subscribers_of(&self, submission_id: &str) -> Vec<ConnectionId> {
        self.lock()
            .by_submission
            .get(submission_id)
            .map(|watchers| watchers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, submission_id: &str) -> usize {
        self.lock()
            .by_submission
            .get(submission_id)
            .map_or(0, HashSet::len)
    }

    pub fn subscriptions_of(&self, connection_id: ConnectionId) -> Vec<String> {
        self.lock()
            .by_connection
            .get(&connection_id)
            .map(|watching| watching.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a connection and every pair it owns. Returns the submissions it was watching.
    pub fn remove_connection(&self, connection_id: ConnectionId) -> Vec<String> {
        let mut index = self.lock();
        let Some(watching) = index.by_connection.remove(&connection_id) else {
            return Vec::new();
        };
        for submission_id in &watching {
            index.unlink(connection_id, submission_id);
        }
        index.pairs -= watching.len();
        watching.into_iter().collect()
    }

    /// Drop every pair of a submission. Returns the connections that were watching it.
    pub fn remove_submission(&self, submission_id: &str) -> Vec<ConnectionId> {
        let mut index = self.lock();
        let Some(watchers) = index.by_submission.remove(submission_id) else {
            return Vec::new();
        };
        for connection_id in &watchers {
            if let Some(watching) = index.by_connection.get_mut(connection_id) {
                watching.remove(submission_id);
            }
        }
        index.pairs -= watchers.len();
        watchers.into_iter().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().by_connection.len()
    }

    /// Total (connection, submission) pairs.
    pub fn subscription_count(&self) -> usize {
        self.lock().pairs
    }
}
