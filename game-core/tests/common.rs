#![allow(dead_code)]

use game_core::Game;
use game_types::{Color, GoalPattern, Piece, Polarity, StampMask};

/// Builds colors from plain names
pub fn colors(names: &[&str]) -> Vec<Color> {
    names.iter().map(|name| Color::from(*name)).collect()
}

/// Goal that no sequence of moves can reach with the given colors
pub fn unreachable_goal() -> GoalPattern {
    GoalPattern(std::array::from_fn(|_| Some(Color::from("unreachable"))))
}

/// Red main diagonal, everything else wildcard
#[rustfmt::skip]
pub fn diagonal_goal(color: &str) -> GoalPattern {
    let c = Some(Color::from(color));
    GoalPattern([
        c.clone(), None, None,
        None, c.clone(), None,
        None, None, c,
    ])
}

/// Creates a game that is still waiting for players
pub fn create_waiting_game(names: &[&str], goal: GoalPattern) -> Game {
    Game::new("34567".to_string(), colors(names), goal).expect("valid colors")
}

/// Creates a game with every seat claimed and the game started
pub fn create_playing_game(names: &[&str], goal: GoalPattern) -> Game {
    let mut game = create_waiting_game(names, goal);
    for _ in names {
        let (_, update) = game.claim_seat(None).expect("open seat");
        game.apply(&update);
    }
    let update = game.start_if_ready(names.len()).expect("enough players");
    game.apply(&update);
    game
}

/// Plays a move for whoever's turn it is and applies it
pub fn play_current(game: &mut Game, anchor: usize, mask: &StampMask, polarity: Polarity) -> bool {
    let actor = game.state.current_player.clone();
    let outcome = game
        .play_move(&actor, anchor, mask, polarity)
        .expect("move by current player");
    game.apply(&outcome.update);
    outcome.goal_reached
}

/// Single-cell stamp at the stamp's top-left
pub fn dot() -> StampMask {
    let mut cells = [false; 9];
    cells[0] = true;
    StampMask(cells)
}

pub fn color_at(game: &Game, index: usize) -> Option<&str> {
    game.state.grid[index].as_ref().map(|piece: &Piece| piece.color.as_str())
}
