use serde::Deserialize;
use utoipa::IntoParams;

/// Query string accepted by the realtime endpoint.
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// travel here instead of in `Authorization`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RealtimeQuery {
    /// Signed session token.
    pub token: Option<String>,
}
