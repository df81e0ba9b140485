use game_types::{BOARD_CELLS, BOARD_HEIGHT, BOARD_WIDTH, Cell, Color, GameError, Piece, Polarity, StampMask};

pub fn empty_grid() -> Vec<Cell> {
    vec![None; BOARD_CELLS]
}

/// Mixes two colors. Equal colors mix to themselves, two distinct
/// primaries mix to their secondary, and anything else keeps `first`.
pub fn mix_colors(first: &Color, second: &Color) -> Color {
    if first == second {
        return first.clone();
    }

    let mixed = match (first.as_str(), second.as_str()) {
        ("red", "green") | ("green", "red") => "yellow",
        ("red", "blue") | ("blue", "red") => "purple",
        ("green", "blue") | ("blue", "green") => "cyan",
        _ => return first.clone(),
    };

    Color::from(mixed)
}

/// Board indices a stamp anchored at `anchor` would touch. Cells that fall
/// off the right or bottom edge are dropped.
pub fn affected_indices(anchor: usize, mask: &StampMask) -> Vec<usize> {
    let anchor_row = anchor / BOARD_WIDTH;
    let anchor_col = anchor % BOARD_WIDTH;

    mask.offsets()
        .map(|(r, c)| (anchor_row + r, anchor_col + c))
        .filter(|&(row, col)| row < BOARD_HEIGHT && col < BOARD_WIDTH)
        .map(|(row, col)| row * BOARD_WIDTH + col)
        .collect()
}

/// Returns a new grid with the stamp applied; the input is left untouched.
pub fn apply_pattern(
    grid: &[Cell],
    anchor: usize,
    mask: &StampMask,
    polarity: Polarity,
    acting_color: &Color,
) -> Result<Vec<Cell>, GameError> {
    if grid.len() != BOARD_CELLS {
        return Err(GameError::InvalidMove {
            reason: format!("grid has {} cells, expected {}", grid.len(), BOARD_CELLS),
        });
    }
    if anchor >= BOARD_CELLS {
        return Err(GameError::InvalidMove {
            reason: format!("anchor {} is outside the board", anchor),
        });
    }

    let mut next = grid.to_vec();
    for index in affected_indices(anchor, mask) {
        next[index] = match polarity {
            Polarity::Additive => match &next[index] {
                Some(existing) => Some(Piece::circle(mix_colors(&existing.color, acting_color))),
                None => Some(Piece::circle(acting_color.clone())),
            },
            Polarity::Subtractive => None,
        };
    }

    Ok(next)
}
