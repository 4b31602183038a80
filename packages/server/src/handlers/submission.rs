use axum::{
    Json,
    extract::{Path, State},
};
use tracing::debug;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::state::AppState;
use crate::store::TerminalRecord;

#[utoipa::path(
    get,
    path = "/{id}/result",
    tag = "Submissions",
    operation_id = "getSubmissionResult",
    summary = "Get the final result of a submission",
    description = "Returns the persisted terminal result. Clients without a realtime connection poll this endpoint until it stops returning 404.",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Terminal result", body = TerminalRecord),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not judged yet (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn get_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TerminalRecord>, AppError> {
    debug!(submission_id = %id, user_id = auth_user.user_id, "Polling submission result");

    let record = state
        .store
        .find_result(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No result for submission {id}")))?;

    Ok(Json(record))
}
