//! Key mapping from terminal events to commands.

use crate::types::GameAction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Everything a key press can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Forward an intent to the game engine
    Game(GameAction),
    /// Consume a play and start a new game
    NewGame,
    /// Publish the final result of the finished game
    Publish,
    /// Daily check-in for bonus plays
    CheckIn,
    /// Refresh the leaderboard
    Leaderboard,
}

/// Map keyboard input to a command.
///
/// Down arrow and space both hard-drop; `s`/`j` perform a scored soft drop.
pub fn handle_key_event(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }

    let action = match key.code {
        // Movement
        KeyCode::Left | KeyCode::Char('h' | 'H' | 'a' | 'A') => GameAction::MoveLeft,
        KeyCode::Right | KeyCode::Char('l' | 'L' | 'd' | 'D') => GameAction::MoveRight,
        KeyCode::Char('s' | 'S' | 'j' | 'J') => GameAction::SoftDrop,

        // Rotation
        KeyCode::Up | KeyCode::Char('k' | 'K' | 'w' | 'W') => GameAction::Rotate,

        // Drops
        KeyCode::Down | KeyCode::Char(' ') => GameAction::HardDrop,

        // Ledger-side commands
        KeyCode::Char('n' | 'N') => return Some(Command::NewGame),
        KeyCode::Char('p' | 'P') => return Some(Command::Publish),
        KeyCode::Char('c' | 'C') => return Some(Command::CheckIn),
        KeyCode::Char('b' | 'B') => return Some(Command::Leaderboard),

        _ => return None,
    };

    Some(Command::Game(action))
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}
