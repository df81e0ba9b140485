use chrono::{DateTime, Utc};
use game_types::{GamePhase, GameRecord};
use std::time::Duration;

/// Decides when a game no longer needs in-memory coordination state.
/// The durable record is never touched.
#[derive(Debug, Clone)]
pub struct GameCleanup {
    pub idle_threshold: Duration,    // No updates for this long
    pub finished_threshold: Duration, // Grace period after the goal was reached
}

impl Default for GameCleanup {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(7200), // 2 hours
            finished_threshold: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl GameCleanup {
    pub fn new(idle_threshold: Duration, finished_threshold: Duration) -> Self {
        Self {
            idle_threshold,
            finished_threshold,
        }
    }

    pub fn should_evict(&self, game: &GameRecord, now: DateTime<Utc>) -> bool {
        let threshold = match game.phase {
            GamePhase::Finished => self.finished_threshold,
            GamePhase::Waiting | GamePhase::Playing => self.idle_threshold,
        };

        self.idle_for(game, now)
            .map(|idle| idle > threshold)
            .unwrap_or(true)
    }

    /// Time since the last update; `None` if the timestamp is unreadable.
    fn idle_for(&self, game: &GameRecord, now: DateTime<Utc>) -> Option<Duration> {
        let updated_at = DateTime::parse_from_rfc3339(&game.updated_at).ok()?;
        let elapsed = now.signed_duration_since(updated_at.with_timezone(&Utc));
        Some(elapsed.to_std().unwrap_or(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Game;
    use game_types::{Color, GoalPattern};

    fn create_test_game() -> Game {
        Game::new(
            "34567".to_string(),
            vec![Color::from("red"), Color::from("green")],
            GoalPattern(Default::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_cleanup_configuration() {
        let cleanup = GameCleanup::default();

        assert_eq!(cleanup.idle_threshold, Duration::from_secs(7200));
        assert_eq!(cleanup.finished_threshold, Duration::from_secs(600));
    }

    #[test]
    fn test_fresh_game_is_kept() {
        let cleanup = GameCleanup::default();
        let game = create_test_game();
        assert!(!cleanup.should_evict(&game.state, Utc::now()));
    }

    #[test]
    fn test_idle_game_is_evicted() {
        let cleanup = GameCleanup::new(Duration::from_secs(60), Duration::from_secs(10));
        let game = create_test_game();

        let later = Utc::now() + chrono::Duration::seconds(61);
        assert!(cleanup.should_evict(&game.state, later));
    }

    #[test]
    fn test_finished_game_uses_shorter_threshold() {
        let cleanup = GameCleanup::new(Duration::from_secs(60), Duration::from_secs(10));
        let mut game = create_test_game();
        game.state.phase = GamePhase::Finished;

        let later = Utc::now() + chrono::Duration::seconds(11);
        assert!(cleanup.should_evict(&game.state, later));

        game.state.phase = GamePhase::Playing;
        assert!(!cleanup.should_evict(&game.state, later));
    }

    #[test]
    fn test_unreadable_timestamp_is_evicted() {
        let cleanup = GameCleanup::default();
        let mut game = create_test_game();
        game.state.updated_at = "yesterday".to_string();
        assert!(cleanup.should_evict(&game.state, Utc::now()));
    }
}
