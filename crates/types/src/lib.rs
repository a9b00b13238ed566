//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data with no external dependencies, so they can be used by
//! the game engine, the terminal front end and the ledger sync layer alike.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19)
//! - **Spawn position**: (`BOARD_WIDTH / 2 - 1`, 0)
//!
//! # Gravity
//!
//! The gravity period shrinks by 50ms per level and is floor-clamped:
//!
//! | Level | Interval |
//! |-------|----------|
//! | 1 | 800ms |
//! | 2 | 750ms |
//! | 5 | 600ms |
//! | 10 | 350ms |
//! | 15+ | 100ms |
//!
//! # Examples
//!
//! ```
//! use fhe_tetris_types::{GameAction, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::T.color().to_hex(), "#A000F0");
//! assert_eq!(PieceKind::ALL.len(), 7);
//! assert_ne!(GameAction::HardDrop, GameAction::SoftDrop);
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Spawn column for new pieces (horizontal center)
pub const SPAWN_X: i8 = (BOARD_WIDTH / 2) as i8 - 1;

/// Spawn row for new pieces
pub const SPAWN_Y: i8 = 0;

/// Frame interval of the terminal loop in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 1
pub const BASE_DROP_MS: u32 = 800;

/// Gravity speed-up per level
pub const DROP_STEP_MS: u32 = 50;

/// Minimum gravity interval
pub const DROP_INTERVAL_MIN_MS: u32 = 100;

/// Score needed per level
pub const POINTS_PER_LEVEL: u32 = 500;

/// Simultaneous-clear multipliers in halves, indexed by rows cleared.
///
/// 1 row = x1, 2 rows = x1.5, 3 rows = x2, 4 rows = x3.
pub const CLEAR_MULTIPLIER_HALVES: [u32; 5] = [0, 2, 3, 4, 6];

/// Points awarded per row for flagged soft drops
pub const SOFT_DROP_POINTS: u32 = 1;

/// The seven piece kinds
///
/// Each piece has a distinct shape and color:
/// - **I**: Cyan, horizontal bar
/// - **O**: Yellow, 2x2 square
/// - **T**: Purple, T-shaped
/// - **S**: Green, S-shaped
/// - **Z**: Red, Z-shaped (mirror of S)
/// - **J**: Blue, J-shaped
/// - **L**: Orange, L-shaped (mirror of J)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds in a fixed order (used for random selection)
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Convert to uppercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::O => "O",
            PieceKind::T => "T",
            PieceKind::S => "S",
            PieceKind::Z => "Z",
            PieceKind::J => "J",
            PieceKind::L => "L",
        }
    }

    /// Display color of the piece (also the tag stamped into board cells)
    pub fn color(&self) -> Rgb {
        match self {
            PieceKind::I => Rgb::new(0x00, 0xF0, 0xF0),
            PieceKind::O => Rgb::new(0xF0, 0xF0, 0x00),
            PieceKind::T => Rgb::new(0xA0, 0x00, 0xF0),
            PieceKind::S => Rgb::new(0x00, 0xF0, 0x00),
            PieceKind::Z => Rgb::new(0xF0, 0x00, 0x00),
            PieceKind::J => Rgb::new(0x00, 0x00, 0xF0),
            PieceKind::L => Rgb::new(0xF0, 0xA0, 0x00),
        }
    }
}

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB` form
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Player intents that drive the game engine
///
/// These are produced by the keyboard mapping and consumed by
/// `GameState::apply_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Drop piece one cell down, awarding a soft-drop point
    SoftDrop,
    /// Instantly drop piece to lowest valid position and lock it
    HardDrop,
    /// Rotate piece 90° clockwise
    Rotate,
}

/// A cell on the game board
///
/// - `None`: Empty cell
/// - `Some(PieceKind)`: Cell filled with the color of the given piece kind
pub type Cell = Option<PieceKind>;

/// Final values of a finished game, frozen at game over.
///
/// This is what the score submission pipeline encrypts and publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GameResult {
    pub score: u32,
    pub lines: u32,
    pub level: u32,
}

/// Core-side event emitted after a piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    pub lines_cleared: u32,
    pub points: u32,
    pub combo: u32,
    pub game_over: bool,
}
