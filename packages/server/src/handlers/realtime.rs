use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use tracing::warn;

use crate::extractors::auth::authorization_header;
use crate::models::realtime::RealtimeQuery;
use crate::realtime::{GatewayStatus, messages::close_code, session};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/ws",
    tag = "Realtime",
    operation_id = "connectRealtime",
    summary = "Open a realtime status channel",
    description = "Upgrades to a WebSocket. The token is read from the `token` query parameter, falling back to `Authorization: Bearer`. A rejected credential completes the handshake and closes immediately with code 4401. Once open the client sends `{\"type\":\"subscribe\",\"submissionId\":...}` and `{\"type\":\"unsubscribe\",...}`; the server pushes `connected`, `subscribed`, `unsubscribed` and `status` frames.",
    params(RealtimeQuery),
    responses(
        (status = 101, description = "Switching protocols"),
    ),
)]
pub async fn connect(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let credential = query
        .token
        .as_deref()
        .or_else(|| authorization_header(&headers));

    match state.authenticator.authenticate(credential) {
        Ok(user) => {
            let gateway = Arc::clone(&state.gateway);
            ws.on_upgrade(move |socket| session::run(gateway, socket, user))
        }
        Err(e) => {
            warn!(error = %e, "Rejected realtime connection");
            ws.on_upgrade(|socket| {
                session::reject(socket, close_code::UNAUTHORIZED, "unauthorized")
            })
        }
    }
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "Realtime",
    operation_id = "getRealtimeStatus",
    summary = "Realtime gateway statistics",
    description = "Point-in-time count of open connections and live subscriptions.",
    responses(
        (status = 200, description = "Gateway status", body = GatewayStatus),
    ),
)]
pub async fn status(State(state): State<AppState>) -> Json<GatewayStatus> {
    Json(state.gateway.status())
}
