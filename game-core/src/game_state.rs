use std::collections::HashSet;

use game_types::{
    Color, GameCode, GameError, GamePhase, GameRecord, GameSnapshot, GameUpdate, GoalPattern,
    PlayerInfo, PlayerRecord, Polarity, Seat, Shape, StampMask,
};
use rand::Rng;
use tracing::debug;

use crate::{apply_pattern, empty_grid, matches};

pub const GAME_CODE_LENGTH: usize = 5;
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Draws a join code from the shape digits 3..=8 (7776 possible codes).
pub fn generate_game_code<R: Rng + ?Sized>(rng: &mut R) -> GameCode {
    (0..GAME_CODE_LENGTH)
        .map(|_| {
            let shape = Shape::ALL[rng.gen_range(0..Shape::ALL.len())];
            char::from(b'0' + shape.digit())
        })
        .collect()
}

pub fn validate_colors(colors: &[Color]) -> Result<(), GameError> {
    if colors.len() < MIN_PLAYERS_TO_START {
        return Err(GameError::InvalidColors {
            reason: format!("got {}", colors.len()),
        });
    }
    if colors.iter().any(|color| color.as_str().trim().is_empty()) {
        return Err(GameError::InvalidColors {
            reason: "color names must not be empty".to_string(),
        });
    }

    let distinct: HashSet<&Color> = colors.iter().collect();
    if distinct.len() != colors.len() {
        return Err(GameError::InvalidColors {
            reason: "colors must be distinct".to_string(),
        });
    }

    Ok(())
}

/// Result of an accepted move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub update: GameUpdate,
    pub goal_reached: bool,
}

/// Turn engine over one game record.
///
/// Transitions never mutate `state` directly: each returns the
/// `GameUpdate` to persist, which is then folded in with [`Game::apply`]
/// once the store has accepted it.
#[derive(Debug, Clone)]
pub struct Game {
    pub state: GameRecord,
}

impl Game {
    pub fn new(id: GameCode, colors: Vec<Color>, goal: GoalPattern) -> Result<Self, GameError> {
        validate_colors(&colors)?;

        let now = chrono::Utc::now().to_rfc3339();
        let seats = colors
            .iter()
            .map(|color| Seat {
                color: color.clone(),
                occupied: false,
            })
            .collect();

        let state = GameRecord {
            id,
            grid: empty_grid(),
            turn: 0,
            phase: GamePhase::Waiting,
            current_player: colors[0].clone(),
            turn_order: colors,
            seats,
            goal,
            winner: None,
            revision: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        Ok(Self { state })
    }

    pub fn from_record(state: GameRecord) -> Self {
        Self { state }
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    fn next_update(&self) -> GameUpdate {
        GameUpdate::new(self.state.revision + 1, chrono::Utc::now().to_rfc3339())
    }

    fn is_seated(&self, color: &Color) -> bool {
        self.state.seat(color).is_some_and(|seat| seat.occupied)
    }

    /// Index of the first seated color in turn order after `turn`,
    /// wrapping around. Falls back to `turn` if nobody else is seated.
    fn next_seated_turn(&self, turn: usize) -> usize {
        let order = &self.state.turn_order;
        (1..=order.len())
            .map(|step| (turn + step) % order.len())
            .find(|&idx| self.is_seated(&order[idx]))
            .unwrap_or(turn)
    }

    /// Picks a seat for a joining player: the preferred color if it is
    /// still open, otherwise the first open seat in creation order.
    pub fn claim_seat(&self, preferred: Option<&Color>) -> Result<(Color, GameUpdate), GameError> {
        let assigned = preferred
            .and_then(|color| self.state.seat(color))
            .filter(|seat| !seat.occupied)
            .or_else(|| self.state.open_seats().next())
            .map(|seat| seat.color.clone())
            .ok_or(GameError::GameFull)?;

        let seats = self
            .state
            .seats
            .iter()
            .map(|seat| Seat {
                color: seat.color.clone(),
                occupied: seat.occupied || seat.color == assigned,
            })
            .collect();

        let mut update = self.next_update();
        update.seats = Some(seats);
        Ok((assigned, update))
    }

    /// Reopens a seat whose player record could not be written.
    pub fn release_seat(&self, color: &Color) -> Option<GameUpdate> {
        if !self.state.seat(color)?.occupied {
            return None;
        }

        let seats = self
            .state
            .seats
            .iter()
            .map(|seat| Seat {
                color: seat.color.clone(),
                occupied: seat.occupied && &seat.color != color,
            })
            .collect();

        let mut update = self.next_update();
        update.seats = Some(seats);
        Some(update)
    }

    /// `waiting -> playing` once enough players have joined, handing the
    /// turn to the first seated color. Returns `None` when there is nothing
    /// to do, so concurrent observers can all call it.
    pub fn start_if_ready(&self, joined_players: usize) -> Option<GameUpdate> {
        if self.state.phase != GamePhase::Waiting || joined_players < MIN_PLAYERS_TO_START {
            return None;
        }

        // First seated color in turn order opens; unclaimed colors are skipped
        let order = &self.state.turn_order;
        let turn = order
            .iter()
            .position(|color| self.is_seated(color))
            .unwrap_or(0);

        let mut update = self.next_update();
        update.phase = Some(GamePhase::Playing);
        update.turn = Some(turn);
        update.current_player = Some(order[turn].clone());
        Some(update)
    }

    pub fn play_move(
        &self,
        actor: &Color,
        anchor: usize,
        mask: &StampMask,
        polarity: Polarity,
    ) -> Result<MoveOutcome, GameError> {
        if self.state.phase != GamePhase::Playing {
            return Err(GameError::GameNotPlaying {
                phase: self.state.phase,
            });
        }
        if actor != &self.state.current_player {
            return Err(GameError::NotYourTurn);
        }

        let grid = apply_pattern(&self.state.grid, anchor, mask, polarity, actor)?;
        let goal_reached = matches(&grid, &self.state.goal);

        let turn = self.next_seated_turn(self.state.turn);
        let mut update = self.next_update();
        update.current_player = Some(self.state.turn_order[turn].clone());
        update.turn = Some(turn);
        update.grid = Some(grid);

        if goal_reached {
            update.phase = Some(GamePhase::Finished);
            update.winner = Some(actor.clone());
        }

        debug!(
            "Move by {} on game {} at anchor {} (goal reached: {})",
            actor, self.state.id, anchor, goal_reached
        );

        Ok(MoveOutcome {
            update,
            goal_reached,
        })
    }

    /// Folds a persisted update into the in-memory record. Backward phase
    /// changes are ignored.
    pub fn apply(&mut self, update: &GameUpdate) {
        let mut update = update.clone();
        if let Some(phase) = update.phase {
            if !self.state.phase.can_advance_to(phase) {
                update.phase = None;
            }
        }
        self.state.apply_update(&update);
    }

    /// Client-facing view; the goal stays behind.
    pub fn snapshot(&self, players: &[PlayerRecord]) -> GameSnapshot {
        GameSnapshot {
            game_id: self.state.id.clone(),
            phase: self.state.phase,
            grid: self.state.grid.clone(),
            turn: self.state.turn,
            current_player: self.state.current_player.clone(),
            turn_order: self.state.turn_order.clone(),
            players: players.iter().map(PlayerInfo::from).collect(),
            winner: self.state.winner.clone(),
            revision: self.state.revision,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
