#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use game_core::GameCleanup;
use game_persistence::{GameStore, MemoryStore, StoreError};
use game_server::broadcaster::{Broadcaster, Subscription};
use game_server::registry::{RegistrySettings, SessionRegistry};
use game_types::{
    Color, GameCode, GameRecord, GameSnapshot, GameUpdate, GoalPattern, PlayerRecord, StreamEvent,
};

pub fn colors(names: &[&str]) -> Vec<Color> {
    names.iter().map(|name| Color::from(*name)).collect()
}

/// A goal no sequence of test moves can reach.
pub fn unreachable_goal() -> GoalPattern {
    GoalPattern(std::array::from_fn(|_| Some(Color::from("black"))))
}

/// Goal satisfied by a single red piece anywhere.
pub fn single_red_goal() -> GoalPattern {
    let mut cells: [Option<Color>; 9] = Default::default();
    cells[0] = Some(Color::from("red"));
    GoalPattern(cells)
}

/// Memory store that can be told to fail specific calls.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_updates: AtomicBool,
    pub fail_player_inserts: AtomicBool,
    pub fail_reads: AtomicBool,
    pub duplicate_inserts: AtomicU32,
}

impl FailingStore {
    fn unavailable() -> StoreError {
        StoreError::Corrupt {
            key: "test".to_string(),
            message: "store unavailable".to_string(),
        }
    }
}

#[async_trait]
impl GameStore for FailingStore {
    async fn get(&self, game_id: &str) -> Result<Option<GameRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(game_id).await
    }

    async fn insert(&self, game: &GameRecord) -> Result<(), StoreError> {
        let remaining = self.duplicate_inserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.duplicate_inserts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Duplicate {
                key: game.id.clone(),
            });
        }
        self.inner.insert(game).await
    }

    async fn update(&self, game_id: &str, update: &GameUpdate) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.update(game_id, update).await
    }

    async fn list_players(&self, game_id: &str) -> Result<Vec<PlayerRecord>, StoreError> {
        self.inner.list_players(game_id).await
    }

    async fn insert_player(&self, player: &PlayerRecord) -> Result<(), StoreError> {
        if self.fail_player_inserts.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.insert_player(player).await
    }

    async fn touch_player(&self, player_id: &str, last_seen: &str) -> Result<(), StoreError> {
        self.inner.touch_player(player_id, last_seen).await
    }
}

/// Test setup that provides all necessary components
pub struct TestGameServerSetup {
    pub store: Arc<FailingStore>,
    pub registry: Arc<SessionRegistry>,
}

impl TestGameServerSetup {
    pub fn new() -> Self {
        Self::with_settings(RegistrySettings::default())
    }

    pub fn with_settings(settings: RegistrySettings) -> Self {
        let store = Arc::new(FailingStore::default());
        let broadcaster = Arc::new(Broadcaster::new(
            Duration::from_millis(20),
            Duration::from_secs(30),
        ));
        let registry = Arc::new(SessionRegistry::new(store.clone(), broadcaster, settings));
        Self { store, registry }
    }

    /// Releases finished and idle games right away.
    pub fn with_eager_cleanup() -> Self {
        Self::with_settings(RegistrySettings {
            cleanup: GameCleanup::new(Duration::from_secs(3600), Duration::ZERO),
            ..RegistrySettings::default()
        })
    }

    pub async fn record(&self, game_id: &str) -> GameRecord {
        self.store
            .inner
            .get(game_id)
            .await
            .unwrap()
            .expect("game should exist")
    }

    pub async fn create_game(&self, names: &[&str], goal: GoalPattern) -> GameCode {
        self.registry
            .create_game_with_goal(colors(names), goal)
            .await
            .expect("game should be created")
    }

    /// Creates a game and joins one player per color, in order.
    pub async fn create_playing_game(
        &self,
        names: &[&str],
        goal: GoalPattern,
    ) -> (GameCode, Vec<PlayerRecord>) {
        let game_code = self.create_game(names, goal).await;
        let mut players = Vec::new();
        for name in names {
            let player = self
                .registry
                .join_game(&game_code, Some(Color::from(*name)))
                .await
                .expect("join should succeed");
            players.push(player);
        }
        (game_code, players)
    }
}

pub async fn next_event(subscription: &mut Subscription) -> StreamEvent {
    tokio::time::timeout(Duration::from_secs(2), subscription.next_event())
        .await
        .expect("Timeout waiting for event")
        .expect("Subscription closed")
}

/// Skips connection and keepalive events.
pub async fn next_snapshot(subscription: &mut Subscription) -> GameSnapshot {
    loop {
        if let StreamEvent::GameUpdate(snapshot) = next_event(subscription).await {
            return snapshot;
        }
    }
}
