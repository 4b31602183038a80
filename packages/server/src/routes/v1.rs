use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/judge", judge_routes())
        .nest("/submissions", submission_routes())
        .nest("/realtime", realtime_routes())
}

fn judge_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::judge::ingest_event))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::submission::get_result))
}

fn realtime_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::realtime::connect))
        .routes(routes!(handlers::realtime::status))
}
