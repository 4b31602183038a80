use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{RecordOutcome, ResultStore, StoreError, TerminalRecord};

/// Process-local result store for development and tests.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: DashMap<String, TerminalRecord>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn record_terminal_result(
        &self,
        record: TerminalRecord,
    ) -> Result<RecordOutcome, StoreError> {
        match self.records.entry(record.submission_id.clone()) {
            Entry::Occupied(existing) => Ok(RecordOutcome::AlreadyRecorded(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(RecordOutcome::Recorded)
            }
        }
    }

    async fn find_result(&self, submission_id: &str) -> Result<Option<TerminalRecord>, StoreError> {
        Ok(self.records.get(submission_id).map(|r| r.value().clone()))
    }
}
