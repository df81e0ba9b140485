mod common;

use common::*;
use game_core::{PATTERN_CATALOG, affected_indices};
use game_types::{Color, GameError, GamePhase, Polarity, StampMask};

#[test]
fn test_game_creation() {
    let game = create_waiting_game(&["red", "green"], unreachable_goal());
    assert_eq!(game.phase(), GamePhase::Waiting);
    assert_eq!(game.state.turn_order, colors(&["red", "green"]));
    assert_eq!(game.state.seats.len(), 2);
}

#[test]
fn test_two_joins_fill_both_colors() {
    let mut game = create_waiting_game(&["red", "green"], unreachable_goal());

    let (first, update) = game.claim_seat(Some(&Color::from("green"))).unwrap();
    game.apply(&update);
    let (second, update) = game.claim_seat(Some(&Color::from("green"))).unwrap();
    game.apply(&update);

    assert_eq!(first, Color::from("green"));
    assert_eq!(second, Color::from("red"));
    assert_eq!(game.claim_seat(None).unwrap_err(), GameError::GameFull);

    let update = game.start_if_ready(2).unwrap();
    game.apply(&update);
    assert_eq!(game.phase(), GamePhase::Playing);
}

#[test]
fn test_diagonal_goal_built_over_several_turns() {
    let mut game = create_playing_game(&["red", "green"], diagonal_goal("red"));

    // red paints (2,3), green paints far away, red (3,4), green, red (4,5)
    assert!(!play_current(&mut game, 19, &dot(), Polarity::Additive));
    assert!(!play_current(&mut game, 63, &dot(), Polarity::Additive));
    assert!(!play_current(&mut game, 28, &dot(), Polarity::Additive));
    assert!(!play_current(&mut game, 62, &dot(), Polarity::Additive));
    assert!(play_current(&mut game, 37, &dot(), Polarity::Additive));

    assert_eq!(game.phase(), GamePhase::Finished);
    assert_eq!(game.state.winner, Some(Color::from("red")));
}

#[test]
fn test_mixed_color_does_not_satisfy_primary_goal() {
    let mut game = create_playing_game(&["red", "green"], diagonal_goal("red"));

    play_current(&mut game, 0, &PATTERN_CATALOG[4], Polarity::Additive); // red diagonal
    assert_eq!(game.phase(), GamePhase::Finished);

    let mut game = create_playing_game(&["green", "red"], diagonal_goal("red"));
    play_current(&mut game, 0, &PATTERN_CATALOG[4], Polarity::Additive); // green
    play_current(&mut game, 0, &PATTERN_CATALOG[4], Polarity::Additive); // red over green
    assert_eq!(color_at(&game, 9), Some("yellow"));
    assert_eq!(game.phase(), GamePhase::Playing);
}

#[test]
fn test_rejected_move_leaves_state_unchanged() {
    let game = create_playing_game(&["red", "green"], unreachable_goal());
    let before = game.state.clone();

    let result = game.play_move(&Color::from("green"), 0, &StampMask::FULL, Polarity::Additive);
    assert_eq!(result.unwrap_err(), GameError::NotYourTurn);
    assert_eq!(game.state, before);
}

#[test]
fn test_corner_anchor_touches_one_cell() {
    let mut game = create_playing_game(&["red", "green"], unreachable_goal());
    play_current(&mut game, 63, &StampMask::FULL, Polarity::Additive);

    let painted = game.state.grid.iter().filter(|cell| cell.is_some()).count();
    assert_eq!(painted, 1);
    assert_eq!(affected_indices(63, &StampMask::FULL).len(), 1);
}
