pub mod config;
pub mod judge_status;
pub mod progress;

pub use config::MqAppConfig;
pub use judge_status::{ExternalStatus, JudgeStatus, map_status};
pub use progress::{
    CaseOutcome, CaseSummary, EventKind, ProgressEvent, StatusUpdate, TestCaseProgress,
};
