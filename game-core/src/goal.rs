use game_types::{BOARD_HEIGHT, BOARD_WIDTH, Cell, Color, GoalPattern, STAMP_CELLS, STAMP_SIZE};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::mix_colors;

/// Upper bound on distinct colors a goal may use.
const GOAL_PALETTE_SIZE: usize = 6;

/// Returns true if the goal appears in any 3x3 window of the grid.
///
/// A constrained goal cell needs an occupied grid cell of exactly that
/// color; wildcard cells always match. Stops at the first matching window.
pub fn matches(grid: &[Cell], goal: &GoalPattern) -> bool {
    if grid.len() != BOARD_WIDTH * BOARD_HEIGHT {
        return false;
    }

    (0..=BOARD_HEIGHT - STAMP_SIZE)
        .flat_map(|row| (0..=BOARD_WIDTH - STAMP_SIZE).map(move |col| (row, col)))
        .any(|(row, col)| window_matches(grid, goal, row, col))
}

fn window_matches(grid: &[Cell], goal: &GoalPattern, top: usize, left: usize) -> bool {
    for r in 0..STAMP_SIZE {
        for c in 0..STAMP_SIZE {
            let Some(expected) = goal.get(r, c) else {
                continue;
            };
            match &grid[(top + r) * BOARD_WIDTH + left + c] {
                Some(piece) if &piece.color == expected => {}
                _ => return false,
            }
        }
    }
    true
}

/// Colors a goal may ask for: the players' colors followed by every
/// secondary they can mix, capped at six.
pub fn goal_palette(colors: &[Color]) -> Vec<Color> {
    let mut palette: Vec<Color> = Vec::new();
    for color in colors {
        if !palette.contains(color) {
            palette.push(color.clone());
        }
    }

    for (i, first) in colors.iter().enumerate() {
        for second in &colors[i + 1..] {
            let mixed = mix_colors(first, second);
            if !palette.contains(&mixed) {
                palette.push(mixed);
            }
        }
    }

    palette.truncate(GOAL_PALETTE_SIZE);
    palette
}

/// Builds a goal with 2 to 7 constrained cells drawn from `goal_palette`.
pub fn generate_goal<R: Rng + ?Sized>(colors: &[Color], rng: &mut R) -> GoalPattern {
    let palette = goal_palette(colors);
    let mut cells: [Option<Color>; STAMP_CELLS] = Default::default();
    if palette.is_empty() {
        return GoalPattern(cells);
    }

    let filled = rng.gen_range(2..=7);
    let mut positions: Vec<usize> = (0..STAMP_CELLS).collect();
    positions.shuffle(rng);

    for &pos in positions.iter().take(filled) {
        cells[pos] = palette.choose(rng).cloned();
    }

    GoalPattern(cells)
}
