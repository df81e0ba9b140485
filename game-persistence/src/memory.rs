use std::collections::HashMap;

use async_trait::async_trait;
use game_types::{GameRecord, GameUpdate, PlayerRecord};
use tokio::sync::RwLock;

use crate::store::{GameStore, StoreError};

/// Process-local store, used for tests and single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<String, GameRecord>>,
    players: RwLock<Vec<PlayerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get(&self, game_id: &str) -> Result<Option<GameRecord>, StoreError> {
        let games = self.games.read().await;
        Ok(games.get(game_id).cloned())
    }

    async fn insert(&self, game: &GameRecord) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Err(StoreError::Duplicate {
                key: game.id.clone(),
            });
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn update(&self, game_id: &str, update: &GameUpdate) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or_else(|| StoreError::NotFound {
            key: game_id.to_string(),
        })?;
        game.apply_update(update);
        Ok(())
    }

    async fn list_players(&self, game_id: &str) -> Result<Vec<PlayerRecord>, StoreError> {
        let players = self.players.read().await;
        Ok(players
            .iter()
            .filter(|player| player.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn insert_player(&self, player: &PlayerRecord) -> Result<(), StoreError> {
        if !self.games.read().await.contains_key(&player.game_id) {
            return Err(StoreError::NotFound {
                key: player.game_id.clone(),
            });
        }

        let mut players = self.players.write().await;
        if players.iter().any(|existing| existing.id == player.id) {
            return Err(StoreError::Duplicate {
                key: player.id.clone(),
            });
        }
        players.push(player.clone());
        Ok(())
    }

    async fn touch_player(&self, player_id: &str, last_seen: &str) -> Result<(), StoreError> {
        let mut players = self.players.write().await;
        let player = players
            .iter_mut()
            .find(|player| player.id == player_id)
            .ok_or_else(|| StoreError::NotFound {
                key: player_id.to_string(),
            })?;
        player.last_seen = last_seen.to_string();
        Ok(())
    }
}
