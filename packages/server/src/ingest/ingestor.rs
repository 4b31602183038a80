use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use common::{
    CaseOutcome, CaseSummary, EventKind, ExternalStatus, JudgeStatus, ProgressEvent, StatusUpdate,
    map_status,
};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::observers::{ObserverId, ObserverRegistry, ResultCallback};
use crate::store::{RecordOutcome, ResultStore, StoreError, TerminalRecord};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Progress event has no submission id")]
    MissingSubmissionId,

    #[error("Failed to persist terminal result: {0}")]
    Store(#[from] StoreError),
}

/// What happened to an ingested event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Intermediate progress forwarded to observers.
    Progress { status: JudgeStatus, notified: usize },
    /// Terminal result persisted and forwarded to observers.
    Recorded { status: JudgeStatus, notified: usize },
    /// A terminal result already existed; nothing was written or forwarded.
    Duplicate { status: JudgeStatus },
    /// Progress for a submission that already finished; dropped.
    Late,
}

/// Per-submission processing lane. Holding its lock serializes events of one submission.
struct Lane {
    cases: Vec<CaseOutcome>,
    last_seen: Instant,
}

impl Default for Lane {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            last_seen: Instant::now(),
        }
    }
}

impl Lane {
    fn record_case(&mut self, case: CaseOutcome) {
        match self.cases.iter_mut().find(|existing| existing.id == case.id) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
    }
}

/// Consumes judging-engine events, persists terminal verdicts and notifies observers.
pub struct JudgeResultIngestor {
    store: Arc<dyn ResultStore>,
    observers: ObserverRegistry,
    lanes: DashMap<String, Arc<Mutex<Lane>>>,
    /// Submissions whose terminal result is known, with when it was seen.
    finished: DashMap<String, Instant>,
}

impl JudgeResultIngestor {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            observers: ObserverRegistry::default(),
            lanes: DashMap::new(),
            finished: DashMap::new(),
        }
    }

    /// Register a callback for every subsequent event of `submission_id`.
    ///
    /// Callbacks of a submission are dropped once its terminal event has been delivered.
    /// Registering for a finished submission is accepted but the callback never runs.
    pub fn on_result(&self, submission_id: &str, callback: ResultCallback) -> ObserverId {
        let id = self.observers.register(submission_id, callback);
        // Terminal delivery marks the submission finished before clearing its observers,
        // so a registration racing it is removed by one side or the other.
        if self.finished.contains_key(submission_id) {
            self.observers.remove(submission_id, id);
        }
        id
    }

    pub fn remove_observer(&self, submission_id: &str, id: ObserverId) -> bool {
        self.observers.remove(submission_id, id)
    }

    pub fn observer_count(&self, submission_id: &str) -> usize {
        self.observers.count(submission_id)
    }

    /// Number of submissions with events in flight (seen but not yet terminal).
    pub fn active_submissions(&self) -> usize {
        self.lanes.len()
    }

    /// Forget lanes idle for at least `max_age` and finished markers older than that.
    ///
    /// Returns how many lanes were dropped. Lanes busy with an event are kept.
    pub fn reap(&self, max_age: Duration) -> usize {
        let before = self.lanes.len();
        self.lanes.retain(|_, lane| {
            let idle = lane
                .try_lock()
                .map(|lane| lane.last_seen.elapsed() >= max_age)
                .unwrap_or(false);
            !idle
        });
        self.finished.retain(|_, seen| seen.elapsed() < max_age);
        before.saturating_sub(self.lanes.len())
    }

    /// Periodically reap idle lanes. The task ends once the ingestor is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let ingestor: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);

            loop {
                interval.tick().await;
                let Some(ingestor) = ingestor.upgrade() else {
                    break;
                };
                let removed = ingestor.reap(max_age);
                if removed > 0 {
                    info!(removed, "Reclaimed idle judge lanes");
                }
            }
        })
    }

    pub async fn ingest(&self, event: ProgressEvent) -> Result<IngestOutcome, IngestError> {
        if event.submission_id.trim().is_empty() {
            return Err(IngestError::MissingSubmissionId);
        }

        let lane = self.lane(&event.submission_id);
        let mut guard = lane.lock().await;

        if event.kind == EventKind::Case && self.finished.contains_key(&event.submission_id) {
            drop(guard);
            self.lanes
                .remove_if(&event.submission_id, |_, current| Arc::ptr_eq(current, &lane));
            debug!(
                submission_id = %event.submission_id,
                "Dropping progress for a finished submission"
            );
            return Ok(IngestOutcome::Late);
        }
        guard.last_seen = Instant::now();

        match event.kind {
            EventKind::Case => Ok(self.ingest_progress(&event, &mut guard)),
            EventKind::End => {
                let result = self.ingest_terminal(&event, &guard).await;
                if result.is_ok() {
                    drop(guard);
                    self.lanes
                        .remove_if(&event.submission_id, |_, current| Arc::ptr_eq(current, &lane));
                }
                result
            }
        }
    }

    fn lane(&self, submission_id: &str) -> Arc<Mutex<Lane>> {
        Arc::clone(
            self.lanes
                .entry(submission_id.to_owned())
                .or_default()
                .value(),
        )
    }

    fn mark_finished(&self, submission_id: &str) {
        self.finished.insert(submission_id.to_owned(), Instant::now());
    }

    fn ingest_progress(&self, event: &ProgressEvent, lane: &mut Lane) -> IngestOutcome {
        warn_if_unrecognized(&event.submission_id, event.external_status);

        // A case frame never carries the final verdict, whatever code it reports.
        let status = match event.external_status.map(JudgeStatus::from) {
            Some(JudgeStatus::Pending) => JudgeStatus::Pending,
            _ => JudgeStatus::Judging,
        };

        let test_case = event.test_case.as_ref().map(|case| {
            warn_if_unrecognized(&event.submission_id, Some(case.external_status));
            let outcome = CaseOutcome::from(case);
            lane.record_case(outcome.clone());
            outcome
        });

        let update = StatusUpdate {
            submission_id: event.submission_id.clone(),
            kind: EventKind::Case,
            status,
            score: event.score,
            time: event.time,
            memory: event.memory,
            message: event.message.clone(),
            compiler_text: None,
            test_case,
        };

        let notified = self.observers.notify(&update);
        debug!(
            submission_id = %event.submission_id,
            %status,
            notified,
            "Forwarded judge progress"
        );

        IngestOutcome::Progress { status, notified }
    }

    async fn ingest_terminal(
        &self,
        event: &ProgressEvent,
        lane: &Lane,
    ) -> Result<IngestOutcome, IngestError> {
        if event.external_status.is_none() {
            warn!(
                submission_id = %event.submission_id,
                "Terminal event without a status, recording system error"
            );
        }
        warn_if_unrecognized(&event.submission_id, event.external_status);

        let record = terminal_record(event, &lane.cases);

        if let RecordOutcome::AlreadyRecorded(existing) =
            self.store.record_terminal_result(record.clone()).await?
        {
            self.mark_finished(&event.submission_id);
            self.observers.clear(&event.submission_id);

            if is_redelivery(&existing, &record, event) {
                info!(
                    submission_id = %event.submission_id,
                    status = %existing.status,
                    "Redelivered terminal event ignored"
                );
            } else {
                warn!(
                    submission_id = %event.submission_id,
                    stored = %existing.status,
                    incoming = %record.status,
                    "Conflicting terminal event ignored, keeping first result"
                );
            }
            return Ok(IngestOutcome::Duplicate {
                status: existing.status,
            });
        }

        let update = StatusUpdate {
            submission_id: record.submission_id.clone(),
            kind: EventKind::End,
            status: record.status,
            score: record.score,
            time: record.time,
            memory: record.memory,
            message: record.runtime_error.clone(),
            compiler_text: record.compile_error.clone(),
            test_case: None,
        };

        let notified = self.observers.notify(&update);
        self.mark_finished(&record.submission_id);
        self.observers.clear(&record.submission_id);

        info!(
            submission_id = %record.submission_id,
            status = %record.status,
            time = ?record.time,
            memory = ?record.memory,
            notified,
            "Recorded terminal judge result"
        );

        Ok(IngestOutcome::Recorded {
            status: record.status,
            notified,
        })
    }
}

/// Whether `incoming` restates the stored result rather than contradicting it.
///
/// Totals the event left out were aggregated from cases the first time and cannot be
/// recomputed once the lane is gone, so they are not compared.
fn is_redelivery(
    existing: &TerminalRecord,
    incoming: &TerminalRecord,
    event: &ProgressEvent,
) -> bool {
    let mut incoming = incoming.clone();
    if event.time.is_none() {
        incoming.time = existing.time;
    }
    if event.memory.is_none() {
        incoming.memory = existing.memory;
    }
    existing.same_outcome(&incoming)
}

/// Build the persisted record for a terminal event.
///
/// Time and memory reported on the event win; otherwise they are aggregated from
/// the cases seen so far.
fn terminal_record(event: &ProgressEvent, cases: &[CaseOutcome]) -> TerminalRecord {
    let status = map_status(event.external_status);
    let summary = CaseSummary::from_cases(cases);
    let has_cases = summary.count > 0;

    let non_empty = |text: &Option<String>| text.clone().filter(|t| !t.is_empty());

    TerminalRecord {
        submission_id: event.submission_id.clone(),
        status,
        score: event.score,
        time: event.time.or(has_cases.then_some(summary.total_time)),
        memory: event.memory.or(has_cases.then_some(summary.max_memory)),
        compile_error: (status == JudgeStatus::CompileError)
            .then(|| non_empty(&event.compiler_text))
            .flatten(),
        runtime_error: (status == JudgeStatus::RuntimeError)
            .then(|| non_empty(&event.message))
            .flatten(),
        judged_at: Utc::now(),
    }
}

fn warn_if_unrecognized(submission_id: &str, status: Option<ExternalStatus>) {
    if let Some(external) = status
        && !external.is_recognized()
    {
        warn!(
            submission_id,
            code = external.code(),
            "Unknown judge status code, treating as system error"
        );
    }
}
