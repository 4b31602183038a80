use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::gateway::{AdmissionError, RealtimeGateway};
use super::messages::close_code;
use crate::utils::jwt::AuthenticatedUser;

/// Drive one upgraded socket until either side closes it.
pub async fn run(gateway: Arc<RealtimeGateway>, socket: WebSocket, user: AuthenticatedUser) {
    let connection = match gateway.open(user.user_id) {
        Ok(connection) => connection,
        Err(AdmissionError::CapacityReached) => {
            reject(socket, close_code::TRY_AGAIN_LATER, "too many connections").await;
            return;
        }
        Err(AdmissionError::ShuttingDown) => {
            reject(socket, close_code::GOING_AWAY, "server shutting down").await;
            return;
        }
    };

    let connection_id = connection.id;
    let mut outbound = connection.outbound;
    let shutdown = gateway.shutdown_token();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(close(close_code::GOING_AWAY, "server shutting down")).await;
                break;
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
                    debug!(%connection_id, error = %e, "Realtime send failed");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    gateway.handle_client_message(connection_id, text.as_str());
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!(%connection_id, "Ignoring binary client message");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%connection_id, error = %e, "Realtime receive failed");
                    break;
                }
            },
        }
    }

    gateway.close(connection_id);
}

/// Close a socket that was never admitted.
pub async fn reject(mut socket: WebSocket, code: u16, reason: &'static str) {
    if let Err(e) = socket.send(close(code, reason)).await {
        debug!(code, error = %e, "Failed to send close frame");
    }
}

fn close(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}
