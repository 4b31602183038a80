use std::sync::Arc;

use common::ProgressEvent;
use mq::{BroccoliError, BrokerMessage, Mq};
use tracing::{error, info, warn};

use crate::ingest::{IngestError, JudgeResultIngestor};

/// Consume judging-engine progress events from the progress queue.
pub async fn consume_progress_events(
    ingestor: Arc<JudgeResultIngestor>,
    mq: Arc<Mq>,
    queue_name: String,
) {
    info!(queue = %queue_name, "Starting judge progress consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // sequential, so per-submission order follows queue order
            None,
            move |message: BrokerMessage<ProgressEvent>| {
                let ingestor = Arc::clone(&ingestor);
                async move { handle_progress_event(&ingestor, message.payload).await }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Judge progress consumer stopped unexpectedly");
    }
}

async fn handle_progress_event(
    ingestor: &JudgeResultIngestor,
    event: ProgressEvent,
) -> Result<(), BroccoliError> {
    let submission_id = event.submission_id.clone();
    match ingestor.ingest(event).await {
        Ok(_) => Ok(()),
        // Retrying cannot fix an event without an id.
        Err(IngestError::MissingSubmissionId) => {
            warn!("Dropping progress event without a submission id");
            Ok(())
        }
        Err(e) => {
            error!(
                submission_id = %submission_id,
                error = %e,
                "Failed to ingest judge progress"
            );
            Err(BroccoliError::Job(e.to_string()))
        }
    }
}
