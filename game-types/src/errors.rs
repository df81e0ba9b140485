use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::GamePhase;

/// Every way a client operation can fail. The variant determines the
/// `ErrorKind`, which transports map to their own status codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum GameError {
    #[error("Need at least 2 distinct colors: {reason}")]
    InvalidColors { reason: String },
    #[error("Invalid game code: {code}")]
    InvalidCode { code: String },
    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },
    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: String },
    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },
    #[error("Game is full")]
    GameFull,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Game is not being played (phase: {phase})")]
    GameNotPlaying { phase: GamePhase },
    #[error("Failed to create game")]
    CreateFailed,
    #[error("Store error: {message}")]
    Store { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation, // Rejected before touching state
    Conflict,   // Game state unchanged
    NotFound,
    Store, // Durable write failed, nothing assumed applied
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidColors { .. }
            | GameError::InvalidCode { .. }
            | GameError::InvalidMove { .. } => ErrorKind::Validation,
            GameError::GameFull | GameError::NotYourTurn | GameError::GameNotPlaying { .. } => {
                ErrorKind::Conflict
            }
            GameError::GameNotFound { .. } | GameError::PlayerNotFound { .. } => {
                ErrorKind::NotFound
            }
            GameError::CreateFailed | GameError::Store { .. } => ErrorKind::Store,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum ConnectionError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Invalid message: {message}")]
    InvalidMessage { message: String },
    #[error("Join or watch a game first")]
    NotInGame,
    #[error("Connection closed")]
    Closed,
}
