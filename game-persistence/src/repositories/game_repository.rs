use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, SqlErr,
};

use crate::entities::{games, players, prelude::*};
use crate::store::{GameStore, StoreError};
use game_types::{Color, GamePhase, GameRecord, GameUpdate, PlayerRecord};

/// `GameStore` backed by a sea-orm connection.
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_game(model: games::Model) -> Result<GameRecord, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            key: model.id.clone(),
            message,
        };

        let turn = usize::try_from(model.turn).map_err(|_| corrupt(format!("turn {}", model.turn)))?;
        let revision =
            u64::try_from(model.revision).map_err(|_| corrupt(format!("revision {}", model.revision)))?;
        let phase = parse_phase(&model.phase).ok_or_else(|| corrupt(format!("phase {}", model.phase)))?;

        Ok(GameRecord {
            grid: serde_json::from_str(&model.grid)?,
            turn,
            phase,
            current_player: Color::new(model.current_player),
            turn_order: serde_json::from_str(&model.turn_order)?,
            seats: serde_json::from_str(&model.seats)?,
            goal: serde_json::from_str(&model.goal)?,
            winner: model.winner.map(Color::new),
            revision,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
            id: model.id,
        })
    }

    fn model_to_player(model: players::Model) -> PlayerRecord {
        PlayerRecord {
            id: model.id,
            game_id: model.game_id,
            color: Color::new(model.color),
            joined_at: model.joined_at.to_rfc3339(),
            last_seen: model.last_seen.to_rfc3339(),
        }
    }
}

fn parse_phase(phase: &str) -> Option<GamePhase> {
    match phase {
        "waiting" => Some(GamePhase::Waiting),
        "playing" => Some(GamePhase::Playing),
        "finished" => Some(GamePhase::Finished),
        _ => None,
    }
}

fn parse_timestamp(key: &str, value: &str) -> Result<sea_orm::prelude::DateTimeWithTimeZone, StoreError> {
    chrono::DateTime::parse_from_rfc3339(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: format!("timestamp {}: {}", value, e),
    })
}

fn map_insert_error(key: &str, err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Duplicate {
            key: key.to_string(),
        },
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreError::NotFound {
            key: key.to_string(),
        },
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl GameStore for SeaOrmStore {
    async fn get(&self, game_id: &str) -> Result<Option<GameRecord>, StoreError> {
        let model = Games::find_by_id(game_id.to_string()).one(&self.db).await?;
        model.map(Self::model_to_game).transpose()
    }

    async fn insert(&self, game: &GameRecord) -> Result<(), StoreError> {
        let model = games::ActiveModel {
            id: Set(game.id.clone()),
            grid: Set(serde_json::to_string(&game.grid)?),
            turn: Set(game.turn as i32),
            phase: Set(game.phase.to_string()),
            current_player: Set(game.current_player.to_string()),
            turn_order: Set(serde_json::to_string(&game.turn_order)?),
            seats: Set(serde_json::to_string(&game.seats)?),
            goal: Set(serde_json::to_string(&game.goal)?),
            winner: Set(game.winner.as_ref().map(Color::to_string)),
            revision: Set(game.revision as i64),
            created_at: Set(parse_timestamp(&game.id, &game.created_at)?),
            updated_at: Set(parse_timestamp(&game.id, &game.updated_at)?),
        };

        Games::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|err| map_insert_error(&game.id, err))?;
        Ok(())
    }

    async fn update(&self, game_id: &str, update: &GameUpdate) -> Result<(), StoreError> {
        let mut model = games::ActiveModel {
            revision: Set(update.revision as i64),
            updated_at: Set(parse_timestamp(game_id, &update.updated_at)?),
            ..Default::default()
        };

        if let Some(grid) = &update.grid {
            model.grid = Set(serde_json::to_string(grid)?);
        }
        if let Some(turn) = update.turn {
            model.turn = Set(turn as i32);
        }
        if let Some(current_player) = &update.current_player {
            model.current_player = Set(current_player.to_string());
        }
        if let Some(phase) = update.phase {
            model.phase = Set(phase.to_string());
        }
        if let Some(seats) = &update.seats {
            model.seats = Set(serde_json::to_string(seats)?);
        }
        if let Some(winner) = &update.winner {
            model.winner = Set(Some(winner.to_string()));
        }

        let result = Games::update_many()
            .set(model)
            .filter(games::Column::Id.eq(game_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                key: game_id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_players(&self, game_id: &str) -> Result<Vec<PlayerRecord>, StoreError> {
        let models = Players::find()
            .filter(players::Column::GameId.eq(game_id))
            .order_by_asc(players::Column::JoinedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::model_to_player).collect())
    }

    async fn insert_player(&self, player: &PlayerRecord) -> Result<(), StoreError> {
        let model = players::ActiveModel {
            id: Set(player.id.clone()),
            game_id: Set(player.game_id.clone()),
            color: Set(player.color.to_string()),
            joined_at: Set(parse_timestamp(&player.id, &player.joined_at)?),
            last_seen: Set(parse_timestamp(&player.id, &player.last_seen)?),
        };

        Players::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|err| map_insert_error(&player.id, err))?;
        Ok(())
    }

    async fn touch_player(&self, player_id: &str, last_seen: &str) -> Result<(), StoreError> {
        let model = players::ActiveModel {
            last_seen: Set(parse_timestamp(player_id, last_seen)?),
            ..Default::default()
        };

        let result = Players::update_many()
            .set(model)
            .filter(players::Column::Id.eq(player_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                key: player_id.to_string(),
            });
        }
        Ok(())
    }
}
