use common::StatusUpdate;
use serde::{Deserialize, Serialize};

use super::registry::ConnectionId;

/// Control messages a client may send over its realtime connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(alias = "submission_id")]
        submission_id: String,
    },
    Unsubscribe {
        #[serde(alias = "submission_id")]
        submission_id: String,
    },
}

/// Frames pushed to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage<'a> {
    Connected { connection_id: ConnectionId },
    Subscribed { submission_id: &'a str },
    Unsubscribed { submission_id: &'a str },
    Status(&'a StatusUpdate),
}

impl ServerMessage<'_> {
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

/// A serialized server message, shared between every connection it is pushed to.
pub type Frame = std::sync::Arc<str>;

/// WebSocket close codes used by the gateway.
pub mod close_code {
    pub const GOING_AWAY: u16 = 1001;
    pub const TRY_AGAIN_LATER: u16 = 1013;
    pub const UNAUTHORIZED: u16 = 4401;
}
