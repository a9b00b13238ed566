//! Terminal rendering for the game.
//!
//! [`GameView`] paints a [`GameState`](crate::core::GameState) and a side panel
//! into a [`FrameBuffer`]; [`TerminalRenderer`] flushes that buffer to the real
//! terminal, redrawing only the runs that changed since the last frame.

pub mod fb;
pub mod game_view;
pub mod renderer;

pub use fhe_tetris_core as core;
pub use fhe_tetris_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer};
pub use game_view::{GameView, SidePanel, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
