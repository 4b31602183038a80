use serde::{Deserialize, Serialize};

use crate::judge_status::{ExternalStatus, JudgeStatus};

/// Whether an event reports intermediate progress or the final verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Case,
    End,
}

/// A progress or terminal event emitted by the judging engine.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub submission_id: String,
    pub kind: EventKind,
    /// Engine status code; absent on some progress frames.
    #[serde(default, alias = "status")]
    #[schema(value_type = Option<i32>)]
    pub external_status: Option<ExternalStatus>,
    #[serde(default)]
    pub score: Option<i32>,
    /// Total time in milliseconds.
    #[serde(default, alias = "timeMs")]
    pub time: Option<u64>,
    /// Peak memory in kilobytes.
    #[serde(default, alias = "memoryKb")]
    pub memory: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub compiler_text: Option<String>,
    #[serde(default, alias = "case")]
    pub test_case: Option<TestCaseProgress>,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::End
    }
}

/// Result of a single test case as reported by the engine.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseProgress {
    #[serde(alias = "id")]
    pub case_id: u32,
    #[serde(alias = "status")]
    #[schema(value_type = i32)]
    pub external_status: ExternalStatus,
    #[serde(default, alias = "timeMs")]
    pub time: u64,
    #[serde(default, alias = "memoryKb")]
    pub memory: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// A test case result after status normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CaseOutcome {
    pub id: u32,
    pub status: JudgeStatus,
    pub passed: bool,
    /// Milliseconds.
    pub time: u64,
    /// Kilobytes.
    pub memory: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&TestCaseProgress> for CaseOutcome {
    fn from(case: &TestCaseProgress) -> Self {
        let status = JudgeStatus::from(case.external_status);
        Self {
            id: case.case_id,
            status,
            passed: status.is_accepted(),
            time: case.time,
            memory: case.memory,
            message: case.message.clone(),
        }
    }
}

/// Totals over the test cases seen for a submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaseSummary {
    pub count: usize,
    pub total_time: u64,
    pub max_memory: u64,
    /// True iff every case was accepted. Vacuously true for no cases.
    pub all_passed: bool,
}

impl CaseSummary {
    pub fn from_cases<'a>(cases: impl IntoIterator<Item = &'a CaseOutcome>) -> Self {
        cases.into_iter().fold(
            CaseSummary {
                all_passed: true,
                ..Default::default()
            },
            |acc, case| CaseSummary {
                count: acc.count + 1,
                total_time: acc.total_time.saturating_add(case.time),
                max_memory: acc.max_memory.max(case.memory),
                all_passed: acc.all_passed && case.status.is_accepted(),
            },
        )
    }
}

/// A progress event after normalization onto the platform status vocabulary.
///
/// This is both what per-submission observers receive and the body of the
/// `status` frame pushed to subscribed clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub submission_id: String,
    pub kind: EventKind,
    pub status: JudgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<CaseOutcome>,
}

impl StatusUpdate {
    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::End
    }
}
