//! Terminal input module.
//!
//! Maps `crossterm` key events into engine intents ([`crate::types::GameAction`])
//! and front-end commands (new game, publish, check-in, leaderboard).

pub mod map;

pub use fhe_tetris_types as types;

pub use map::{handle_key_event, should_quit, Command};
