//! Persistence of terminal submission results.
//!
//! The store is the authoritative record of a verdict: live status frames are a
//! best-effort accelerant and clients fall back to reading from here.

mod database;
mod memory;

pub use database::DbResultStore;
pub use memory::MemoryResultStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::JudgeStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcome of a submission as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRecord {
    pub submission_id: String,
    pub status: JudgeStatus,
    pub score: Option<i32>,
    /// Milliseconds.
    pub time: Option<u64>,
    /// Kilobytes.
    pub memory: Option<u64>,
    pub compile_error: Option<String>,
    pub runtime_error: Option<String>,
    pub judged_at: DateTime<Utc>,
}

impl TerminalRecord {
    /// Compare everything except the write timestamp.
    pub fn same_outcome(&self, other: &TerminalRecord) -> bool {
        self.submission_id == other.submission_id
            && self.status == other.status
            && self.score == other.score
            && self.time == other.time
            && self.memory == other.memory
            && self.compile_error == other.compile_error
            && self.runtime_error == other.runtime_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// This call wrote the record.
    Recorded,
    /// A terminal record already existed and was left untouched.
    AlreadyRecorded(TerminalRecord),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{field} value {value} does not fit the result schema")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("stored record for {0} is corrupt")]
    Corrupt(String),
}

/// Persists terminal results. `record_terminal_result` is an upsert keyed by
/// submission id where the first write wins.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn record_terminal_result(
        &self,
        record: TerminalRecord,
    ) -> Result<RecordOutcome, StoreError>;

    async fn find_result(&self, submission_id: &str) -> Result<Option<TerminalRecord>, StoreError>;
}
