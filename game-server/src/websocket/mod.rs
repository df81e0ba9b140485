use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::registry::SessionRegistry;
use game_types::{ClientMessage, ConnectionError, ServerMessage};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;


use connection::{Connection, ConnectionId};
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

pub async fn handle_connection(websocket: WebSocket, registry: Arc<SessionRegistry>) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (connection, message_receiver) = Connection::new(connection_id);
    let mut message_handler = MessageHandler::new(connection.clone(), registry);

    let incoming_handler = async {
        let mut rate_limiter = RateLimiter::new();

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if let Err(e) =
                        handle_message(msg, &mut rate_limiter, &mut message_handler).await
                    {
                        warn!("Closing connection {}: {}", connection_id, e);
                        // Best effort, the writer may already be gone
                        let _ = connection.send(ServerMessage::Error {
                            message: e.to_string(),
                        });
                        break;
                    }
                }
                Err(e) => {
                    warn!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }

        let _ = ws_sender.close().await;
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    message_handler.handle_disconnect();
    info!("Connection {} disconnected", connection_id);
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &mut MessageHandler,
) -> Result<(), ConnectionError> {
    if !rate_limiter.try_acquire() {
        return Err(ConnectionError::RateLimitExceeded);
    }

    // Pings, pongs and binary frames carry nothing for us
    if !msg.is_text() {
        debug!("Ignoring non-text frame");
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| ConnectionError::InvalidMessage {
        message: "not valid text".to_string(),
    })?;
    let client_message: ClientMessage =
        serde_json::from_str(text).map_err(|e| ConnectionError::InvalidMessage {
            message: e.to_string(),
        })?;

    message_handler.handle_message(client_message).await
}
