use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broadcaster::{Broadcaster, SnapshotSource, Subscription};
use crate::config::Config;
use game_core::{
    Game, GameCleanup, deal_offers, generate_game_code, generate_goal, validate_colors,
};
use game_persistence::{GameStore, StoreError};
use game_types::{
    Color, GameCode, GameError, GamePhase, GameSnapshot, GameUpdate, GoalPattern, MoveResponse,
    PatternOffer, PlayerRecord, Polarity, StampMask,
};

static GAME_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[3-8]{5}$").expect("game code pattern is valid"));

pub fn validate_game_code(code: &str) -> Result<(), GameError> {
    if GAME_CODE_PATTERN.is_match(code) {
        Ok(())
    } else {
        Err(GameError::InvalidCode {
            code: code.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub offer_count: usize,
    pub create_attempts: u32,
    pub cleanup: GameCleanup,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            offer_count: 5,
            create_attempts: 5,
            cleanup: GameCleanup::default(),
        }
    }
}

impl From<&Config> for RegistrySettings {
    fn from(config: &Config) -> Self {
        let defaults = GameCleanup::default();
        Self {
            offer_count: config.offer_count,
            create_attempts: config.create_attempts,
            cleanup: GameCleanup::new(config.game_idle_timeout(), defaults.finished_threshold),
        }
    }
}

/// Owns every game-level operation. Each one runs inside the game's own
/// lock: read from the store, validate, write back, publish. The store is
/// the only copy of game state; nothing is cached between calls.
pub struct SessionRegistry {
    store: Arc<dyn GameStore>,
    broadcaster: Arc<Broadcaster>,
    locks: DashMap<GameCode, Arc<Mutex<()>>>,
    settings: RegistrySettings,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn GameStore>,
        broadcaster: Arc<Broadcaster>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            store,
            broadcaster,
            locks: DashMap::new(),
            settings,
        }
    }

    fn lock_for(&self, game_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(game_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, game_id: &str) -> Result<Game, GameError> {
        match self.store.get(game_id).await {
            Ok(Some(record)) => Ok(Game::from_record(record)),
            Ok(None) => Err(GameError::GameNotFound {
                game_id: game_id.to_string(),
            }),
            Err(e) => Err(store_failure(game_id, e)),
        }
    }

    async fn players(&self, game_id: &str) -> Result<Vec<PlayerRecord>, GameError> {
        self.store
            .list_players(game_id)
            .await
            .map_err(|e| store_failure(game_id, e))
    }

    /// Persists an update, then folds it into the loaded game.
    async fn commit(&self, game: &mut Game, update: GameUpdate) -> Result<(), GameError> {
        let game_id = game.state.id.clone();
        self.store
            .update(&game_id, &update)
            .await
            .map_err(|e| store_failure(&game_id, e))?;
        game.apply(&update);
        Ok(())
    }

    /// `waiting -> playing` if enough players are in. Safe to call from any
    /// number of observers; only the first one writes.
    async fn start_if_ready(&self, game: &mut Game, players: &[PlayerRecord]) -> Result<bool, GameError> {
        match game.start_if_ready(players.len()) {
            Some(update) => {
                self.commit(game, update).await?;
                info!("Game {} started with {} players", game.state.id, players.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn create_game(&self, colors: Vec<Color>) -> Result<GameCode, GameError> {
        validate_colors(&colors)?;
        let goal = generate_goal(&colors, &mut rand::thread_rng());
        self.create_game_with_goal(colors, goal).await
    }

    /// Creates a game with a known goal. Codes that collide with an
    /// existing game are redrawn up to the configured number of attempts.
    pub async fn create_game_with_goal(
        &self,
        colors: Vec<Color>,
        goal: GoalPattern,
    ) -> Result<GameCode, GameError> {
        validate_colors(&colors)?;

        for attempt in 1..=self.settings.create_attempts {
            let code = generate_game_code(&mut rand::thread_rng());
            let game = Game::new(code.clone(), colors.clone(), goal.clone())?;

            match self.store.insert(&game.state).await {
                Ok(()) => {
                    info!("Created game {} with colors {:?}", code, colors);
                    return Ok(code);
                }
                Err(StoreError::Duplicate { .. }) => {
                    debug!("Game code {} taken (attempt {})", code, attempt);
                }
                Err(e) => return Err(store_failure(&code, e)),
            }
        }

        warn!(
            "Gave up creating a game after {} attempts",
            self.settings.create_attempts
        );
        Err(GameError::CreateFailed)
    }

    pub async fn join_game(
        &self,
        game_id: &str,
        preferred_color: Option<Color>,
    ) -> Result<PlayerRecord, GameError> {
        validate_game_code(game_id)?;
        let lock = self.lock_for(game_id);
        let _guard = lock.lock().await;

        let mut game = self.load(game_id).await?;
        let (color, update) = game.claim_seat(preferred_color.as_ref())?;
        self.commit(&mut game, update).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let player = PlayerRecord {
            id: Uuid::new_v4().to_string(),
            game_id: game_id.to_string(),
            color: color.clone(),
            joined_at: now.clone(),
            last_seen: now,
        };

        if let Err(e) = self.store.insert_player(&player).await {
            error!("Failed to record player for game {}: {}", game_id, e);
            if let Some(rollback) = game.release_seat(&color) {
                if let Err(rollback_err) = self.commit(&mut game, rollback).await {
                    error!(
                        "Seat {} in game {} stays occupied: {}",
                        color, game_id, rollback_err
                    );
                }
            }
            return Err(e.into());
        }

        info!("Player {} joined game {} as {}", player.id, game_id, color);

        // The seat is taken from here on; anything below is left to the
        // next poll if it fails.
        match self.players(game_id).await {
            Ok(players) => {
                if let Err(e) = self.start_if_ready(&mut game, &players).await {
                    warn!("Could not start game {}: {}", game_id, e);
                }
                self.broadcaster.publish(game.snapshot(&players));
            }
            Err(e) => warn!("Skipped join broadcast for game {}: {}", game_id, e),
        }

        Ok(player)
    }

    pub async fn submit_move(
        &self,
        game_id: &str,
        player_id: &str,
        anchor: usize,
        mask: StampMask,
        polarity: Polarity,
    ) -> Result<MoveResponse, GameError> {
        validate_game_code(game_id)?;
        let lock = self.lock_for(game_id);
        let _guard = lock.lock().await;

        let mut game = self.load(game_id).await?;
        let players = self.players(game_id).await?;
        let player = players
            .iter()
            .find(|player| player.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound {
                player_id: player_id.to_string(),
            })?;

        let outcome = game
            .play_move(&player.color, anchor, &mask, polarity)
            .inspect_err(|e| warn!("Rejected move by {} in game {}: {}", player_id, game_id, e))?;
        self.commit(&mut game, outcome.update).await?;

        if let Err(e) = self
            .store
            .touch_player(player_id, &game.state.updated_at)
            .await
        {
            warn!("Failed to refresh last seen for {}: {}", player_id, e);
        }

        if outcome.goal_reached {
            info!("Game {} finished, winner {}", game_id, player.color);
        }
        self.broadcaster.publish(game.snapshot(&players));

        Ok(MoveResponse {
            accepted: true,
            goal_reached: outcome.goal_reached,
            revision: game.state.revision,
        })
    }

    /// Current view of a game. Starts it first if enough players have
    /// joined since the last observation.
    pub async fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, GameError> {
        validate_game_code(game_id)?;
        let lock = self.lock_for(game_id);
        let _guard = lock.lock().await;

        let mut game = self.load(game_id).await?;
        let players = self.players(game_id).await?;
        let snapshot = if self.start_if_ready(&mut game, &players).await? {
            let snapshot = game.snapshot(&players);
            self.broadcaster.publish(snapshot.clone());
            snapshot
        } else {
            game.snapshot(&players)
        };

        Ok(snapshot)
    }

    /// Advisory stamps for the player whose turn it is.
    pub async fn offers(&self, game_id: &str, player_id: &str) -> Result<Vec<PatternOffer>, GameError> {
        validate_game_code(game_id)?;
        let lock = self.lock_for(game_id);
        let _guard = lock.lock().await;

        let game = self.load(game_id).await?;
        if game.phase() != GamePhase::Playing {
            return Err(GameError::GameNotPlaying {
                phase: game.phase(),
            });
        }

        let players = self.players(game_id).await?;
        let player = players
            .iter()
            .find(|player| player.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound {
                player_id: player_id.to_string(),
            })?;
        if player.color != game.state.current_player {
            return Err(GameError::NotYourTurn);
        }

        Ok(deal_offers(self.settings.offer_count, &mut rand::thread_rng()))
    }

    /// Opens an event stream on a game. Any player id is accepted, so
    /// spectators can watch too.
    pub async fn subscribe(
        self: &Arc<Self>,
        game_id: &str,
        player_id: &str,
    ) -> Result<Subscription, GameError> {
        validate_game_code(game_id)?;
        if player_id.trim().is_empty() {
            return Err(GameError::PlayerNotFound {
                player_id: player_id.to_string(),
            });
        }
        self.load(game_id).await?;

        let source: Arc<dyn SnapshotSource> = self.clone();
        Ok(self.broadcaster.subscribe(source, game_id, player_id))
    }

    /// Releases coordination state of games that are gone, finished or
    /// idle, plus event channels nobody listens to. Returns the number of
    /// games released.
    pub async fn cleanup(&self) -> usize {
        let game_ids: Vec<GameCode> = self.locks.iter().map(|entry| entry.key().clone()).collect();
        let now = chrono::Utc::now();
        let mut released = 0;

        for game_id in game_ids {
            let evict = match self.store.get(&game_id).await {
                Ok(Some(record)) => self.settings.cleanup.should_evict(&record, now),
                Ok(None) => true,
                Err(e) => {
                    warn!("Cleanup could not read game {}: {}", game_id, e);
                    false
                }
            };
            if !evict {
                continue;
            }

            // Only drop a lock nobody holds or waits on
            let removed = self
                .locks
                .remove_if(&game_id, |_, lock| Arc::strong_count(lock) == 1)
                .is_some();
            if removed {
                released += 1;
                debug!("Released game {}", game_id);
            }
        }

        let channels = self.broadcaster.remove_idle_channels();
        if released > 0 || channels > 0 {
            info!(
                "Cleanup released {} games and {} event channels",
                released, channels
            );
        }
        released
    }

    pub fn tracked_games(&self) -> usize {
        self.locks.len()
    }
}

#[async_trait]
impl SnapshotSource for SessionRegistry {
    async fn poll_snapshot(&self, game_id: &str) -> Result<Option<GameSnapshot>, GameError> {
        match self.snapshot(game_id).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(GameError::GameNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn store_failure(game_id: &str, err: StoreError) -> GameError {
    error!("Store failure on game {}: {}", game_id, err);
    err.into()
}
