//! Integration tests for the game loop: key events -> commands -> engine

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use fhe_tetris::core::{GamePhase, GameState, SPAWN_POSITION};
use fhe_tetris::input::{handle_key_event, should_quit, Command};
use fhe_tetris::types::{GameAction, TICK_MS};

fn press(state: &mut GameState, code: KeyCode) -> Option<Command> {
    let command = handle_key_event(KeyEvent::from(code));
    if let Some(Command::Game(action)) = command {
        state.apply_action(action);
    }
    command
}

#[test]
fn test_game_lifecycle() {
    let mut state = GameState::new(12345);
    assert_eq!(state.phase(), GamePhase::Idle);
    assert!(state.active().is_none());

    assert!(state.start());
    assert_eq!(state.phase(), GamePhase::Active);
    assert!(state.active().is_some());
    assert_eq!(state.position(), SPAWN_POSITION);
    assert_eq!((state.score(), state.lines(), state.level()), (0, 0, 1));
}

#[test]
fn test_keys_drive_the_piece() {
    let mut state = GameState::new(7);
    state.start();
    let start = state.position();

    press(&mut state, KeyCode::Left);
    assert_eq!(state.position().x, start.x - 1);
    press(&mut state, KeyCode::Char('l'));
    press(&mut state, KeyCode::Char('d'));
    assert_eq!(state.position().x, start.x + 1);

    press(&mut state, KeyCode::Char('s'));
    assert_eq!(state.position().y, start.y + 1);
    assert_eq!(state.score(), 1);
}

#[test]
fn test_down_arrow_hard_drops() {
    let mut state = GameState::new(99);
    state.start();

    assert_eq!(
        press(&mut state, KeyCode::Down),
        Some(Command::Game(GameAction::HardDrop))
    );
    assert_eq!(state.board().filled_count(), 4);
    assert_eq!(state.position(), SPAWN_POSITION);
}

#[test]
fn test_ledger_keys_do_not_touch_engine() {
    let mut state = GameState::new(3);
    state.start();
    let before = state.display_board();

    for (code, expected) in [
        (KeyCode::Char('n'), Command::NewGame),
        (KeyCode::Char('p'), Command::Publish),
        (KeyCode::Char('c'), Command::CheckIn),
        (KeyCode::Char('b'), Command::Leaderboard),
    ] {
        assert_eq!(press(&mut state, code), Some(expected));
    }
    assert_eq!(state.display_board(), before);
}

#[test]
fn test_quit_keys() {
    assert!(should_quit(KeyEvent::from(KeyCode::Char('q'))));
    assert!(should_quit(KeyEvent::new(
        KeyCode::Char('c'),
        KeyModifiers::CONTROL
    )));
    assert!(!should_quit(KeyEvent::from(KeyCode::Char('c'))));
}

#[test]
fn test_gravity_follows_tick_cadence() {
    let mut state = GameState::new(42);
    state.start();
    let y0 = state.position().y;

    // 800 ms at level 1: 50 frames of 16 ms.
    for _ in 0..49 {
        state.tick(TICK_MS);
    }
    assert_eq!(state.position().y, y0);
    state.tick(TICK_MS);
    assert_eq!(state.position().y, y0 + 1);
}

#[test]
fn test_hard_drops_end_the_game() {
    let mut state = GameState::new(2024);
    state.start();

    let mut drops = 0;
    while !state.is_over() {
        state.apply_action(GameAction::HardDrop);
        drops += 1;
        assert!(drops < 500, "game never ended");
    }

    let result = state.final_result().expect("final result frozen");
    assert_eq!(result, state.result());

    // Further input is ignored until restart.
    assert!(!state.apply_action(GameAction::MoveLeft));
    assert!(state.start());
    assert_eq!(state.score(), 0);
    assert!(state.final_result().is_none());
}
