//! Core game logic - pure, deterministic, and testable
//!
//! Game rules and state for a 10x20 falling-block game. No UI, networking or I/O
//! lives here; the ledger and terminal layers drive the engine from outside.
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with collision detection and row clearing
//! - [`game_state`]: engine state machine (active piece, scoring, gravity)
//! - [`pieces`]: shape matrices and clockwise rotation
//! - [`rng`]: seeded uniform piece selection
//! - [`scoring`]: line points, level and gravity cadence
//!
//! # Rules
//!
//! - Pieces spawn at column 4, row 0 and are picked uniformly at random.
//! - Rotation has no wall kicks: a blocked rotation is simply ignored.
//! - A piece that cannot descend locks at once (no lock delay).
//! - A blocked spawn ends the game and freezes the final result.
//!
//! # Example
//!
//! ```
//! use fhe_tetris_core::GameState;
//! use fhe_tetris_types::GameAction;
//!
//! let mut game = GameState::new(12345);
//! assert!(game.start());
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::Rotate);
//! game.apply_action(GameAction::HardDrop);
//!
//! // A single drop onto an empty board clears nothing.
//! assert_eq!(game.score(), 0);
//! assert_eq!(game.board().filled_count(), 4);
//! ```
//!
//! # Timing
//!
//! Call [`GameState::tick`](game_state::GameState::tick) every frame with the
//! elapsed milliseconds. Gravity runs every `max(100, 800 - (level - 1) * 50)` ms.

pub mod board;
pub mod game_state;
pub mod pieces;
pub mod rng;
pub mod scoring;

pub use fhe_tetris_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, ClearedRows};
pub use game_state::{GamePhase, GameState, SPAWN_POSITION};
pub use pieces::{get_shape, Piece, Position, Shape};
pub use rng::{PieceQueue, SimpleRng};
pub use scoring::{calculate_drop_score, calculate_level, calculate_line_score, get_drop_interval_ms};
