#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform-facing status of a submission.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum JudgeStatus {
    /// Queued, fetched or compiling on the judging engine.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    /// Test cases are running.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "judging"))]
    Judging,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "accepted"))]
    Accepted,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "wrong_answer"))]
    WrongAnswer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "time_limit_exceeded"))]
    TimeLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "memory_limit_exceeded"))]
    MemoryLimitExceeded,
    /// Program crashed, exited non-zero or exceeded the output limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "runtime_error"))]
    RuntimeError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "compile_error"))]
    CompileError,
    /// Judge-side failure, cancellation, or a status code we do not recognize.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "system_error"))]
    SystemError,
}

impl JudgeStatus {
    /// Returns true if this is a final verdict (judging is complete).
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending | Self::Judging)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// All possible status values.
    pub const ALL: &'static [JudgeStatus] = &[
        Self::Pending,
        Self::Judging,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::CompileError,
        Self::SystemError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Judging => "judging",
            Self::Accepted => "accepted",
            Self::WrongAnswer => "wrong_answer",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::RuntimeError => "runtime_error",
            Self::CompileError => "compile_error",
            Self::SystemError => "system_error",
        }
    }
}

impl fmt::Display for JudgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for JudgeStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status '{invalid}'")]
pub struct ParseStatusError {
    invalid: String,
}

impl FromStr for JudgeStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}

/// Status code as reported by the judging engine.
///
/// Travels as a bare integer on the wire. Codes outside the known table are kept
/// verbatim in [`ExternalStatus::Unknown`] so they can be logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ExternalStatus {
    Waiting,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    RuntimeError,
    CompileError,
    SystemError,
    Canceled,
    Etc,
    Judging,
    Compiling,
    Fetched,
    Unknown(i32),
}

impl ExternalStatus {
    pub const KNOWN: &'static [ExternalStatus] = &[
        Self::Waiting,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::OutputLimitExceeded,
        Self::RuntimeError,
        Self::CompileError,
        Self::SystemError,
        Self::Canceled,
        Self::Etc,
        Self::Judging,
        Self::Compiling,
        Self::Fetched,
    ];

    pub fn code(&self) -> i32 {
        match self {
            Self::Waiting => 0,
            Self::Accepted => 1,
            Self::WrongAnswer => 2,
            Self::TimeLimitExceeded => 3,
            Self::MemoryLimitExceeded => 4,
            Self::OutputLimitExceeded => 5,
            Self::RuntimeError => 6,
            Self::CompileError => 7,
            Self::SystemError => 8,
            Self::Canceled => 9,
            Self::Etc => 10,
            Self::Judging => 20,
            Self::Compiling => 21,
            Self::Fetched => 22,
            Self::Unknown(code) => *code,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<i32> for ExternalStatus {
    fn from(code: i32) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|status| status.code() == code)
            .unwrap_or(Self::Unknown(code))
    }
}

impl From<ExternalStatus> for i32 {
    fn from(status: ExternalStatus) -> Self {
        status.code()
    }
}

impl From<ExternalStatus> for JudgeStatus {
    fn from(external: ExternalStatus) -> Self {
        match external {
            ExternalStatus::Waiting | ExternalStatus::Fetched | ExternalStatus::Compiling => {
                JudgeStatus::Pending
            }
            ExternalStatus::Judging => JudgeStatus::Judging,
            ExternalStatus::Accepted => JudgeStatus::Accepted,
            ExternalStatus::WrongAnswer => JudgeStatus::WrongAnswer,
            ExternalStatus::TimeLimitExceeded => JudgeStatus::TimeLimitExceeded,
            ExternalStatus::MemoryLimitExceeded => JudgeStatus::MemoryLimitExceeded,
            ExternalStatus::OutputLimitExceeded | ExternalStatus::RuntimeError => {
                JudgeStatus::RuntimeError
            }
            ExternalStatus::CompileError => JudgeStatus::CompileError,
            ExternalStatus::SystemError
            | ExternalStatus::Canceled
            | ExternalStatus::Etc
            | ExternalStatus::Unknown(_) => JudgeStatus::SystemError,
        }
    }
}

/// Map an engine status onto the platform taxonomy. An absent status is a system error.
pub fn map_status(external: Option<ExternalStatus>) -> JudgeStatus {
    external.map_or(JudgeStatus::SystemError, JudgeStatus::from)
}
