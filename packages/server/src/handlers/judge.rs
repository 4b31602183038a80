use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use common::ProgressEvent;

use crate::error::{AppError, ErrorBody};
use crate::ingest::IngestOutcome;
use crate::state::AppState;

pub const JUDGE_TOKEN_HEADER: &str = "x-judge-token";

#[utoipa::path(
    post,
    path = "/events",
    tag = "Judge",
    operation_id = "ingestJudgeEvent",
    summary = "Submit a judge progress event",
    description = "Entry point for the judging engine. Accepts a `case` progress event or the terminal `end` event of a submission. Terminal results are persisted once; a repeated terminal event is reported as `duplicate` and leaves the stored result untouched. Authenticated with the shared `X-Judge-Token` header.",
    request_body = ProgressEvent,
    responses(
        (status = 200, description = "Event ingested", body = IngestOutcome),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Result store failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("judge_token" = [])),
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProgressEvent>, JsonRejection>,
) -> Result<Json<IngestOutcome>, AppError> {
    let token = headers
        .get(JUDGE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::TokenMissing)?;
    if token != state.config.judge.token {
        return Err(AppError::TokenInvalid);
    }

    let Json(event) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let outcome = state.ingestor.ingest(event).await?;
    Ok(Json(outcome))
}
