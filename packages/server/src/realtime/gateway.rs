use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use common::StatusUpdate;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cleanup::CleanupScheduler;
use super::messages::{ClientMessage, Frame, ServerMessage};
use super::registry::{ConnectionId, SubscribeOutcome, SubscriptionRegistry};
use crate::config::RealtimeConfig;
use crate::ingest::{JudgeResultIngestor, ObserverId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Gateway is shutting down")]
    ShuttingDown,

    #[error("Connection limit reached")]
    CapacityReached,
}

/// A freshly admitted connection. Frames for it arrive on `outbound`.
#[derive(Debug)]
pub struct OpenConnection {
    pub id: ConnectionId,
    pub outbound: mpsc::Receiver<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct GatewayStatus {
    pub connections: usize,
    pub subscriptions: usize,
}

struct ConnectionHandle {
    user_id: i32,
    outbound: mpsc::Sender<Frame>,
}

/// Pushes normalized judge progress to subscribed realtime connections.
///
/// The gateway owns the connection table and registers one ingestor observer per
/// watched submission. Observers are released when the last subscriber leaves or
/// when the submission's grace period ends.
pub struct RealtimeGateway {
    me: Weak<RealtimeGateway>,
    config: RealtimeConfig,
    registry: SubscriptionRegistry,
    ingestor: Arc<JudgeResultIngestor>,
    connections: DashMap<ConnectionId, ConnectionHandle>,
    /// Admission slots in use. Reserved before a connection is inserted.
    admitted: AtomicUsize,
    watchers: DashMap<String, ObserverId>,
    terminal_frames: DashMap<String, Frame>,
    cleanup: CleanupScheduler,
    shutdown: CancellationToken,
}

impl RealtimeGateway {
    pub fn new(config: RealtimeConfig, ingestor: Arc<JudgeResultIngestor>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            registry: SubscriptionRegistry::new(),
            ingestor,
            connections: DashMap::new(),
            admitted: AtomicUsize::new(0),
            watchers: DashMap::new(),
            terminal_frames: DashMap::new(),
            cleanup: CleanupScheduler::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Admit an authenticated user. The `connected` frame is already queued on return.
    pub fn open(&self, user_id: i32) -> Result<OpenConnection, AdmissionError> {
        if self.shutdown.is_cancelled() {
            return Err(AdmissionError::ShuttingDown);
        }
        let limit = self.config.max_connections;
        let reserved = self
            .admitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < limit).then_some(n + 1));
        if reserved.is_err() {
            warn!(
                user_id,
                limit = self.config.max_connections,
                "Realtime connection refused, limit reached"
            );
            return Err(AdmissionError::CapacityReached);
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        self.connections.insert(
            id,
            ConnectionHandle {
                user_id,
                outbound: tx,
            },
        );
        self.registry.register_connection(id);
        self.send(id, &ServerMessage::Connected { connection_id: id });

        info!(connection_id = %id, user_id, "Realtime connection opened");
        Ok(OpenConnection { id, outbound: rx })
    }

    /// Apply one raw control message. Malformed input is logged and dropped.
    pub fn handle_client_message(&self, connection_id: ConnectionId, raw: &str) {
        let message = match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(%connection_id, error = %e, "Ignoring malformed client message");
                return;
            }
        };

        match message {
            ClientMessage::Subscribe { submission_id } => {
                self.subscribe(connection_id, &submission_id)
            }
            ClientMessage::Unsubscribe { submission_id } => {
                self.unsubscribe(connection_id, &submission_id)
            }
        }
    }

    pub fn subscribe(&self, connection_id: ConnectionId, submission_id: &str) {
        if submission_id.trim().is_empty() {
            warn!(%connection_id, "Ignoring subscribe without a submission id");
            return;
        }

        match self.registry.subscribe(connection_id, submission_id) {
            SubscribeOutcome::UnknownConnection => {
                debug!(%connection_id, submission_id, "Subscribe on a closed connection");
                return;
            }
            SubscribeOutcome::Added => {
                debug!(%connection_id, submission_id, "Subscribed");
            }
            SubscribeOutcome::AlreadySubscribed => {}
        }

        let finished = self
            .terminal_frames
            .get(submission_id)
            .map(|frame| Frame::clone(frame.value()));
        if finished.is_none() {
            self.watch(submission_id);
        }

        self.send(connection_id, &ServerMessage::Subscribed { submission_id });
        if let Some(frame) = finished {
            self.push(connection_id, frame);
        }
    }

    pub fn unsubscribe(&self, connection_id: ConnectionId, submission_id: &str) {
        if self.registry.unsubscribe(connection_id, submission_id) {
            debug!(%connection_id, submission_id, "Unsubscribed");
            self.release_watcher(submission_id);
        }
        self.send(connection_id, &ServerMessage::Unsubscribed { submission_id });
    }

    /// Forget a connection and every subscription it holds. Idempotent.
    pub fn close(&self, connection_id: ConnectionId) {
        let Some((_, handle)) = self.connections.remove(&connection_id) else {
            return;
        };
        self.admitted.fetch_sub(1, Ordering::SeqCst);

        let dropped = self.registry.remove_connection(connection_id);
        for submission_id in &dropped {
            self.release_watcher(submission_id);
        }

        info!(
            %connection_id,
            user_id = handle.user_id,
            subscriptions = dropped.len(),
            "Realtime connection closed"
        );
    }

    /// Fan an update out to every current subscriber of its submission.
    ///
    /// Returns how many connections accepted the frame.
    pub fn broadcast(&self, update: &StatusUpdate) -> usize {
        let frame = match ServerMessage::Status(update).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(
                    submission_id = %update.submission_id,
                    error = %e,
                    "Failed to serialize status frame"
                );
                return 0;
            }
        };

        let delivered = self
            .registry
            .subscribers_of(&update.submission_id)
            .into_iter()
            .filter(|connection_id| self.push(*connection_id, Frame::clone(&frame)))
            .count();

        if update.is_terminal() {
            self.finish(&update.submission_id, frame);
        }

        debug!(
            submission_id = %update.submission_id,
            status = %update.status,
            delivered,
            "Broadcast status"
        );
        delivered
    }

    /// Drop every subscription to a submission along with its cached terminal frame.
    pub fn expire_submission(&self, submission_id: &str) {
        self.cleanup.cancel(submission_id);
        self.terminal_frames.remove(submission_id);
        let dropped = self.registry.remove_submission(submission_id);
        if let Some((_, observer)) = self.watchers.remove(submission_id) {
            self.ingestor.remove_observer(submission_id, observer);
        }
        debug!(
            submission_id,
            subscribers = dropped.len(),
            "Expired finished submission"
        );
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            connections: self.connections.len(),
            subscriptions: self.registry.subscription_count(),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn is_watching(&self, submission_id: &str) -> bool {
        self.watchers.contains_key(submission_id)
    }

    /// Sessions select on this token and close with "going away" once it fires.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Refuse new connections, stop grace timers and signal open sessions to close.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        let timers = self.cleanup.cancel_all();
        info!(
            connections = self.connections.len(),
            timers, "Realtime gateway shutting down"
        );
    }

    fn watch(&self, submission_id: &str) {
        self.watchers
            .entry(submission_id.to_owned())
            .or_insert_with(|| {
                let gateway = self.me.clone();
                self.ingestor.on_result(
                    submission_id,
                    Arc::new(move |update: &StatusUpdate| {
                        if let Some(gateway) = gateway.upgrade() {
                            gateway.broadcast(update);
                        }
                    }),
                )
            });
    }

    /// Deregister the observer of a submission nobody subscribes to any more.
    fn release_watcher(&self, submission_id: &str) {
        let released = self
            .watchers
            .remove_if(submission_id, |_, _| {
                self.registry.subscriber_count(submission_id) == 0
            });
        if let Some((_, observer)) = released {
            self.ingestor.remove_observer(submission_id, observer);
        }
    }

    fn finish(&self, submission_id: &str, frame: Frame) {
        // The ingestor drops a submission's observers after its terminal event.
        self.watchers.remove(submission_id);
        self.terminal_frames.insert(submission_id.to_owned(), frame);

        let gateway = self.me.clone();
        let key = submission_id.to_owned();
        self.cleanup
            .schedule(submission_id, self.config.grace_period(), move || {
                if let Some(gateway) = gateway.upgrade() {
                    gateway.expire_submission(&key);
                }
            });
    }

    fn send(&self, connection_id: ConnectionId, message: &ServerMessage<'_>) -> bool {
        match message.to_frame() {
            Ok(frame) => self.push(connection_id, frame),
            Err(e) => {
                error!(%connection_id, error = %e, "Failed to serialize frame");
                false
            }
        }
    }

    /// Queue a frame without waiting. A full queue drops the new frame.
    fn push(&self, connection_id: ConnectionId, frame: Frame) -> bool {
        let Some(outbound) = self
            .connections
            .get(&connection_id)
            .map(|handle| handle.outbound.clone())
        else {
            return false;
        };

        match outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(%connection_id, "Outbound queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%connection_id, "Outbound queue closed");
                false
            }
        }
    }
}
