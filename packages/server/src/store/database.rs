use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, SqlErr};
use tracing::debug;

use super::{RecordOutcome, ResultStore, StoreError, TerminalRecord};
use crate::entity::submission_result;

/// Postgres-backed result store.
#[derive(Clone)]
pub struct DbResultStore {
    db: DatabaseConnection,
}

impl DbResultStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(
        &self,
        submission_id: &str,
    ) -> Result<Option<submission_result::Model>, DbErr> {
        submission_result::Entity::find_by_id(submission_id.to_owned())
            .one(&self.db)
            .await
    }
}

fn to_column(field: &'static str, value: Option<u64>) -> Result<Option<i64>, StoreError> {
    value
        .map(|v| i64::try_from(v).map_err(|_| StoreError::OutOfRange { field, value: v }))
        .transpose()
}

fn from_column(submission_id: &str, value: Option<i64>) -> Result<Option<u64>, StoreError> {
    value
        .map(|v| u64::try_from(v).map_err(|_| StoreError::Corrupt(submission_id.to_owned())))
        .transpose()
}

impl TryFrom<submission_result::Model> for TerminalRecord {
    type Error = StoreError;

    fn try_from(model: submission_result::Model) -> Result<Self, Self::Error> {
        Ok(TerminalRecord {
            time: from_column(&model.submission_id, model.time_ms)?,
            memory: from_column(&model.submission_id, model.memory_kb)?,
            submission_id: model.submission_id,
            status: model.status,
            score: model.score,
            compile_error: model.compile_error,
            runtime_error: model.runtime_error,
            judged_at: model.judged_at,
        })
    }
}

#[async_trait]
impl ResultStore for DbResultStore {
    async fn record_terminal_result(
        &self,
        record: TerminalRecord,
    ) -> Result<RecordOutcome, StoreError> {
        let model = submission_result::ActiveModel {
            submission_id: Set(record.submission_id.clone()),
            status: Set(record.status),
            score: Set(record.score),
            time_ms: Set(to_column("time", record.time)?),
            memory_kb: Set(to_column("memory", record.memory)?),
            compile_error: Set(record.compile_error.clone()),
            runtime_error: Set(record.runtime_error.clone()),
            judged_at: Set(record.judged_at),
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(RecordOutcome::Recorded),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(
                    submission_id = %record.submission_id,
                    "Terminal result already stored"
                );
                let existing = self.find_model(&record.submission_id).await?.ok_or_else(|| {
                    DbErr::Custom(
                        "UniqueConstraintViolation but existing row not found".to_string(),
                    )
                })?;
                Ok(RecordOutcome::AlreadyRecorded(existing.try_into()?))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_result(&self, submission_id: &str) -> Result<Option<TerminalRecord>, StoreError> {
        self.find_model(submission_id)
            .await?
            .map(TerminalRecord::try_from)
            .transpose()
    }
}
