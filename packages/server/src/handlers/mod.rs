pub mod judge;
pub mod realtime;
pub mod submission;
