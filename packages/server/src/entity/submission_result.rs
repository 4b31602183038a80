use common::JudgeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Terminal verdict of a submission, written once when the judging engine finishes.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_result")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_id: String,

    #[sea_orm(indexed)]
    pub status: JudgeStatus,

    pub score: Option<i32>,

    /// Milliseconds.
    pub time_ms: Option<i64>,

    /// Kilobytes.
    pub memory_kb: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub compile_error: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub runtime_error: Option<String>,

    pub judged_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
