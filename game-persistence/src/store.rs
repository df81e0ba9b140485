use async_trait::async_trait;
use game_types::{GameError, GameRecord, GameUpdate, PlayerRecord};
use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate key: {key}")]
    Duplicate { key: String },
    #[error("Record not found: {key}")]
    NotFound { key: String },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt record {key}: {message}")]
    Corrupt { key: String, message: String },
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        GameError::Store {
            message: err.to_string(),
        }
    }
}

/// Key-value style store for games and their players.
///
/// Implementations give no multi-record atomicity; callers serialize
/// writes per game themselves.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get(&self, game_id: &str) -> Result<Option<GameRecord>, StoreError>;

    /// Fails with `StoreError::Duplicate` if the id is taken.
    async fn insert(&self, game: &GameRecord) -> Result<(), StoreError>;

    async fn update(&self, game_id: &str, update: &GameUpdate) -> Result<(), StoreError>;

    /// Players of a game in join order.
    async fn list_players(&self, game_id: &str) -> Result<Vec<PlayerRecord>, StoreError>;

    async fn insert_player(&self, player: &PlayerRecord) -> Result<(), StoreError>;

    async fn touch_player(&self, player_id: &str, last_seen: &str) -> Result<(), StoreError>;
}
