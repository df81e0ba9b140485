use serde::{Deserialize, Serialize};

use crate::{Cell, Color, GameCode, GamePhase, GoalPattern, PlayerId, PlayerInfo};

/// One entry of a game's ordered occupancy map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub color: Color,
    pub occupied: bool,
}

/// Durable game record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameCode,
    pub grid: Vec<Cell>,
    pub turn: usize,
    pub phase: GamePhase,
    pub current_player: Color,
    pub turn_order: Vec<Color>,
    pub seats: Vec<Seat>,
    pub goal: GoalPattern,
    pub winner: Option<Color>,
    pub revision: u64,
    pub created_at: String, // ISO 8601 string
    pub updated_at: String, // ISO 8601 string
}

impl GameRecord {
    pub fn seat(&self, color: &Color) -> Option<&Seat> {
        self.seats.iter().find(|seat| &seat.color == color)
    }

    pub fn open_seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().filter(|seat| !seat.occupied)
    }

    /// Applies the whitelisted fields of an update. Fields the update
    /// leaves as `None` are untouched.
    pub fn apply_update(&mut self, update: &GameUpdate) {
        if let Some(grid) = &update.grid {
            self.grid = grid.clone();
        }
        if let Some(turn) = update.turn {
            self.turn = turn;
        }
        if let Some(current_player) = &update.current_player {
            self.current_player = current_player.clone();
        }
        if let Some(phase) = update.phase {
            self.phase = phase;
        }
        if let Some(seats) = &update.seats {
            self.seats = seats.clone();
        }
        if let Some(winner) = &update.winner {
            self.winner = Some(winner.clone());
        }
        self.revision = update.revision;
        self.updated_at = update.updated_at.clone();
    }
}

/// Partial update of a game record. Only these fields may change after
/// creation; identity, turn order and goal are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub grid: Option<Vec<Cell>>,
    pub turn: Option<usize>,
    pub current_player: Option<Color>,
    pub phase: Option<GamePhase>,
    pub seats: Option<Vec<Seat>>,
    pub winner: Option<Color>,
    pub revision: u64,
    pub updated_at: String,
}

impl GameUpdate {
    pub fn new(revision: u64, updated_at: String) -> Self {
        Self {
            grid: None,
            turn: None,
            current_player: None,
            phase: None,
            seats: None,
            winner: None,
            revision,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub game_id: GameCode,
    pub color: Color,
    pub joined_at: String, // ISO 8601 string
    pub last_seen: String, // ISO 8601 string
}

impl From<&PlayerRecord> for PlayerInfo {
    fn from(record: &PlayerRecord) -> Self {
        PlayerInfo {
            id: record.id.clone(),
            color: record.color.clone(),
            joined_at: record.joined_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BOARD_CELLS, Piece};

    fn record() -> GameRecord {
        GameRecord {
            id: "34567".to_string(),
            grid: vec![None; BOARD_CELLS],
            turn: 0,
            phase: GamePhase::Waiting,
            current_player: Color::from("red"),
            turn_order: vec![Color::from("red"), Color::from("green")],
            seats: vec![
                Seat { color: Color::from("red"), occupied: false },
                Seat { color: Color::from("green"), occupied: false },
            ],
            goal: GoalPattern(Default::default()),
            winner: None,
            revision: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_apply_update_only_touches_set_fields() {
        let mut game = record();
        let mut grid = game.grid.clone();
        grid[0] = Some(Piece::circle(Color::from("red")));

        let mut update = GameUpdate::new(1, "2024-01-01T00:00:01Z".to_string());
        update.grid = Some(grid.clone());
        update.turn = Some(1);
        game.apply_update(&update);

        assert_eq!(game.grid, grid);
        assert_eq!(game.turn, 1);
        assert_eq!(game.phase, GamePhase::Waiting);
        assert_eq!(game.current_player, Color::from("red"));
        assert_eq!(game.revision, 1);
        assert_eq!(game.updated_at, "2024-01-01T00:00:01Z");
    }

    #[test]
    fn test_open_seats_keep_insertion_order() {
        let mut game = record();
        game.seats[0].occupied = true;

        let open: Vec<_> = game.open_seats().map(|seat| seat.color.as_str()).collect();
        assert_eq!(open, vec!["green"]);
        assert!(game.seat(&Color::from("red")).unwrap().occupied);
        assert!(game.seat(&Color::from("blue")).is_none());
    }
}
