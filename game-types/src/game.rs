use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::{GameCode, PlayerId};

pub const BOARD_WIDTH: usize = 8;
pub const BOARD_HEIGHT: usize = 8;
pub const BOARD_CELLS: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// Stamps and goals are always 3x3.
pub const STAMP_SIZE: usize = 3;
pub const STAMP_CELLS: usize = STAMP_SIZE * STAMP_SIZE;

/// A player or piece color. Names are trimmed and lowercased on the way
/// in, so `"Red"` and `"red"` are the same color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Color(String);

impl Color {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Color::new)
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Piece shapes, numbered by side count. The game code alphabet reuses
/// these digits, with 7 standing in for the circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Shape {
    Triangle,
    Square,
    Pentagon,
    Hexagon,
    Circle,
    Octagon,
}

impl Shape {
    pub const ALL: [Shape; 6] = [
        Shape::Triangle,
        Shape::Square,
        Shape::Pentagon,
        Shape::Hexagon,
        Shape::Circle,
        Shape::Octagon,
    ];

    pub fn digit(self) -> u8 {
        match self {
            Shape::Triangle => 3,
            Shape::Square => 4,
            Shape::Pentagon => 5,
            Shape::Hexagon => 6,
            Shape::Circle => 7,
            Shape::Octagon => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Piece {
    pub color: Color,
    pub shape: Shape,
}

impl Piece {
    pub fn circle(color: Color) -> Self {
        Self {
            color,
            shape: Shape::Circle,
        }
    }
}

/// A grid cell: empty or holding one piece.
pub type Cell = Option<Piece>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum GamePhase {
    Waiting,  // Accepting joins, no moves
    Playing,  // Moves from the current player only
    Finished, // Goal reached, terminal
}

impl GamePhase {
    /// Phases only ever move forward: waiting -> playing -> finished.
    pub fn can_advance_to(self, next: GamePhase) -> bool {
        matches!(
            (self, next),
            (GamePhase::Waiting, GamePhase::Playing) | (GamePhase::Playing, GamePhase::Finished)
        )
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Playing => "playing",
            GamePhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Polarity {
    Additive,    // Paints cells with the acting color
    Subtractive, // Clears cells
}

/// Row-major 3x3 boolean stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StampMask(pub [bool; STAMP_CELLS]);

impl StampMask {
    pub const FULL: StampMask = StampMask([true; STAMP_CELLS]);

    pub fn is_set(&self, row: usize, col: usize) -> bool {
        row < STAMP_SIZE && col < STAMP_SIZE && self.0[row * STAMP_SIZE + col]
    }

    /// (row, col) offsets of every set cell, row-major.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..STAMP_SIZE)
            .flat_map(|row| (0..STAMP_SIZE).map(move |col| (row, col)))
            .filter(move |&(row, col)| self.is_set(row, col))
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|set| **set).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PatternOffer {
    pub id: String,
    pub mask: StampMask,
    pub polarity: Polarity,
}

/// Secret 3x3 target; `None` cells are wildcards. Never part of a
/// client-facing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalPattern(pub [Option<Color>; STAMP_CELLS]);

impl GoalPattern {
    pub fn get(&self, row: usize, col: usize) -> Option<&Color> {
        self.0.get(row * STAMP_SIZE + col).and_then(|cell| cell.as_ref())
    }

    pub fn constrained_cells(&self) -> usize {
        self.0.iter().filter(|cell| cell.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub color: Color,
    pub joined_at: String, // ISO 8601 string
}

/// State published to every subscriber of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameSnapshot {
    pub game_id: GameCode,
    pub phase: GamePhase,
    pub grid: Vec<Cell>,
    pub turn: usize,
    pub current_player: Color,
    pub turn_order: Vec<Color>,
    pub players: Vec<PlayerInfo>,
    pub winner: Option<Color>,
    pub revision: u64,
    pub timestamp: i64, // Unix millis at snapshot time
}
