mod ingestor;
mod observers;

pub use ingestor::{IngestError, IngestOutcome, JudgeResultIngestor};
pub use observers::{ObserverId, ResultCallback};
