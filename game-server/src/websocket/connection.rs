use std::fmt;

use game_types::{GameCode, PlayerId, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::broadcaster::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing half of a socket.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }

    /// Queues a message. Fails only once the socket writer is gone.
    pub fn send(&self, message: ServerMessage) -> Result<(), ServerMessage> {
        self.sender.send(message).map_err(|err| err.0)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The game a socket is attached to. Dropping it ends the event
/// forwarding, and with it the underlying subscription.
#[derive(Debug)]
pub struct GameSession {
    pub game_id: GameCode,
    pub player_id: PlayerId,
    forwarder: JoinHandle<()>,
}

impl GameSession {
    /// Forwards every event of `subscription` to the connection.
    pub fn attach(
        connection: &Connection,
        game_id: GameCode,
        player_id: PlayerId,
        mut subscription: Subscription,
    ) -> Self {
        let connection = connection.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                if connection.send(ServerMessage::Event { event }).is_err() {
                    break;
                }
            }
        });

        Self {
            game_id,
            player_id,
            forwarder,
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
