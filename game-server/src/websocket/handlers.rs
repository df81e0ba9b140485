use std::sync::Arc;

use tracing::{info, warn};

use crate::registry::SessionRegistry;
use crate::websocket::connection::{Connection, GameSession};
use game_types::{
    ClientMessage, Color, ConnectionError, GameCode, GameError, Polarity, ServerMessage, StampMask,
};

/// Per-socket dispatcher. Owned by the socket's reader task, so it needs
/// no locking of its own.
pub struct MessageHandler {
    connection: Connection,
    registry: Arc<SessionRegistry>,
    session: Option<GameSession>,
}

impl MessageHandler {
    pub fn new(connection: Connection, registry: Arc<SessionRegistry>) -> Self {
        Self {
            connection,
            registry,
            session: None,
        }
    }

    pub async fn handle_message(&mut self, message: ClientMessage) -> Result<(), ConnectionError> {
        match message {
            ClientMessage::CreateGame { colors } => self.handle_create_game(colors).await,
            ClientMessage::JoinGame {
                game_id,
                preferred_color,
            } => self.handle_join_game(game_id, preferred_color).await,
            ClientMessage::Watch { game_id, player_id } => {
                self.handle_watch(game_id, player_id).await
            }
            ClientMessage::SubmitMove {
                anchor,
                mask,
                polarity,
            } => self.handle_submit_move(anchor, mask, polarity).await,
            ClientMessage::RequestOffers => self.handle_request_offers().await,
            // Receiving it was the point
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    pub fn handle_disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                "Connection {} left game {} (player {})",
                self.connection.id, session.game_id, session.player_id
            );
        }
    }

    async fn handle_create_game(&mut self, colors: Vec<Color>) -> Result<(), ConnectionError> {
        match self.registry.create_game(colors).await {
            Ok(game_code) => self.send(ServerMessage::GameCreated { game_code }),
            Err(error) => self.reject(error),
        }
    }

    async fn handle_join_game(
        &mut self,
        game_id: GameCode,
        preferred_color: Option<Color>,
    ) -> Result<(), ConnectionError> {
        let player = match self.registry.join_game(&game_id, preferred_color).await {
            Ok(player) => player,
            Err(error) => return self.reject(error),
        };

        self.send(ServerMessage::Joined {
            player_id: player.id.clone(),
            assigned_color: player.color,
        })?;
        self.attach(game_id, player.id).await
    }

    async fn handle_watch(
        &mut self,
        game_id: GameCode,
        player_id: String,
    ) -> Result<(), ConnectionError> {
        self.attach(game_id, player_id).await
    }

    async fn attach(&mut self, game_id: GameCode, player_id: String) -> Result<(), ConnectionError> {
        match self.registry.subscribe(&game_id, &player_id).await {
            Ok(subscription) => {
                info!(
                    "Connection {} watching game {} as {}",
                    self.connection.id, game_id, player_id
                );
                // Replacing a previous session ends its stream
                self.session = Some(GameSession::attach(
                    &self.connection,
                    game_id,
                    player_id,
                    subscription,
                ));
                Ok(())
            }
            Err(error) => self.reject(error),
        }
    }

    async fn handle_submit_move(
        &mut self,
        anchor: usize,
        mask: StampMask,
        polarity: Polarity,
    ) -> Result<(), ConnectionError> {
        let Some(session) = &self.session else {
            return self.send_error(ConnectionError::NotInGame);
        };

        let result = self
            .registry
            .submit_move(
                &session.game_id,
                &session.player_id,
                anchor,
                mask,
                polarity,
            )
            .await;

        match result {
            Ok(response) => self.send(ServerMessage::MoveAccepted {
                goal_reached: response.goal_reached,
                revision: response.revision,
            }),
            Err(error) => self.reject(error),
        }
    }

    async fn handle_request_offers(&mut self) -> Result<(), ConnectionError> {
        let Some(session) = &self.session else {
            return self.send_error(ConnectionError::NotInGame);
        };

        match self
            .registry
            .offers(&session.game_id, &session.player_id)
            .await
        {
            Ok(offers) => self.send(ServerMessage::Offers { offers }),
            Err(error) => self.reject(error),
        }
    }

    fn send(&self, message: ServerMessage) -> Result<(), ConnectionError> {
        self.connection
            .send(message)
            .map_err(|_| ConnectionError::Closed)
    }

    fn reject(&self, error: GameError) -> Result<(), ConnectionError> {
        warn!("Connection {} request rejected: {}", self.connection.id, error);
        self.send(ServerMessage::Rejected { error })
    }

    fn send_error(&self, error: ConnectionError) -> Result<(), ConnectionError> {
        self.send(ServerMessage::Error {
            message: error.to_string(),
        })
    }
}
