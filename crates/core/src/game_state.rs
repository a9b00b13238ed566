//! Game state module - the game engine state machine
//!
//! This module ties together the board, pieces, RNG and scoring.
//!
//! ```text
//! Idle ──start──▶ Active ──lock & merge──▶ Active (next piece)
//!                   ▲  │                 └─▶ GameOver (spawn blocked)
//!                   │  └── move / rotate / soft drop / gravity
//! GameOver ──start──┘
//! ```
//!
//! Locking is instantaneous: a soft drop, gravity step or hard drop that cannot
//! descend merges the piece, clears rows, scores and spawns the next piece in one
//! transition. Invalid intents are no-ops; nothing here returns an error.
//!
//! The engine has no notion of play credits. Callers consume a credit on the ledger
//! before calling [`GameState::start`].

use crate::board::Board;
use crate::pieces::{Piece, Position};
use crate::rng::PieceQueue;
use crate::scoring::{calculate_drop_score, calculate_level, calculate_line_score, get_drop_interval_ms};
use crate::types::{GameAction, GameResult, LockEvent, SPAWN_X, SPAWN_Y};

/// Spawn position for new pieces
pub const SPAWN_POSITION: Position = Position::new(SPAWN_X, SPAWN_Y);

/// Lifecycle phase of a game session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game has been started yet
    Idle,
    /// A piece is falling
    Active,
    /// The last spawn was blocked; the final result is frozen
    GameOver,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    active: Option<Piece>,
    position: Position,
    piece_queue: PieceQueue,
    score: u32,
    lines: u32,
    combo: u32,
    phase: GamePhase,
    /// Frozen at game over; cleared on start.
    final_result: Option<GameResult>,
    drop_timer_ms: u32,
    /// Last lock event (consumed by observers).
    last_event: Option<LockEvent>,
    /// Monotonic count of started games.
    games_started: u32,
}

impl GameState {
    /// Create a new idle game with the given RNG seed
    pub fn new(seed: u32) -> Self {
        Self {
            board: Board::new(),
            active: None,
            position: SPAWN_POSITION,
            piece_queue: PieceQueue::new(seed),
            score: 0,
            lines: 0,
            combo: 0,
            phase: GamePhase::Idle,
            final_result: None,
            drop_timer_ms: 0,
            last_event: None,
            games_started: 0,
        }
    }

    /// Start a new game (`Idle | GameOver -> Active`).
    ///
    /// Clears the board and resets score, lines and combo. Returns false (no-op)
    /// while a game is already running.
    pub fn start(&mut self) -> bool {
        if self.phase == GamePhase::Active {
            return false;
        }

        self.board.clear();
        self.score = 0;
        self.lines = 0;
        self.combo = 0;
        self.final_result = None;
        self.drop_timer_ms = 0;
        self.last_event = None;
        self.games_started = self.games_started.wrapping_add(1);
        self.phase = GamePhase::Active;

        self.spawn_piece()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == GamePhase::Active
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Current level, derived from the score
    pub fn level(&self) -> u32 {
        calculate_level(self.score)
    }

    /// Consecutive locks that cleared at least one row (display only)
    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn games_started(&self) -> u32 {
        self.games_started
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Upcoming piece kind
    pub fn next_piece(&self) -> crate::types::PieceKind {
        self.piece_queue.peek()
    }

    /// Running totals of the current game
    pub fn result(&self) -> GameResult {
        GameResult {
            score: self.score,
            lines: self.lines,
            level: self.level(),
        }
    }

    /// Result frozen at game over (None until the game ends)
    pub fn final_result(&self) -> Option<GameResult> {
        self.final_result
    }

    /// Board with the active piece merged in, for rendering
    pub fn display_board(&self) -> Board {
        match (self.phase, self.active) {
            (GamePhase::Active, Some(piece)) => self.board.merge(&piece, self.position),
            _ => self.board.clone(),
        }
    }

    /// Current gravity interval based on level
    pub fn drop_interval_ms(&self) -> u32 {
        get_drop_interval_ms(self.level())
    }

    /// Spawn the next piece at the spawn position.
    ///
    /// A blocked spawn ends the game and freezes the result.
    fn spawn_piece(&mut self) -> bool {
        let piece = Piece::new(self.piece_queue.draw());

        if self.board.collides(&piece, SPAWN_POSITION) {
            self.active = None;
            self.phase = GamePhase::GameOver;
            self.final_result = Some(self.result());
            return false;
        }

        self.active = Some(piece);
        self.position = SPAWN_POSITION;
        self.drop_timer_ms = 0;
        true
    }

    /// Try to shift the active piece horizontally
    pub fn try_move(&mut self, dx: i8) -> bool {
        if self.phase != GamePhase::Active {
            return false;
        }
        let Some(piece) = self.active else {
            return false;
        };

        let target = self.position.offset(dx, 0);
        if self.board.collides(&piece, target) {
            return false;
        }

        self.position = target;
        true
    }

    /// Try to rotate the active piece clockwise in place (no wall kicks)
    pub fn try_rotate(&mut self) -> bool {
        if self.phase != GamePhase::Active {
            return false;
        }
        let Some(piece) = self.active else {
            return false;
        };

        let rotated = piece.rotated();
        if self.board.collides(&rotated, self.position) {
            return false;
        }

        self.active = Some(rotated);
        true
    }

    /// Advance the active piece one row, locking it if it cannot descend.
    ///
    /// With `award_points` a successful descent scores one point. Returns true
    /// if the piece moved, false if it locked (or nothing was active).
    pub fn soft_drop(&mut self, award_points: bool) -> bool {
        if self.phase != GamePhase::Active {
            return false;
        }
        let Some(piece) = self.active else {
            return false;
        };

        let target = self.position.offset(0, 1);
        if self.board.collides(&piece, target) {
            self.lock_piece();
            return false;
        }

        self.position = target;
        if award_points {
            self.score = self.score.saturating_add(calculate_drop_score(1));
        }
        true
    }

    /// Drop the active piece to its resting row and lock it immediately.
    ///
    /// Returns the number of rows descended.
    pub fn hard_drop(&mut self) -> u32 {
        if self.phase != GamePhase::Active {
            return 0;
        }
        let Some(piece) = self.active else {
            return 0;
        };

        let mut distance: u32 = 0;
        while !self
            .board
            .collides(&piece, self.position.offset(0, distance as i8 + 1))
        {
            distance += 1;
        }

        self.position = self.position.offset(0, distance as i8);
        self.lock_piece();
        distance
    }

    /// One gravity step (soft drop without points)
    pub fn step(&mut self) -> bool {
        self.soft_drop(false)
    }

    /// Lock the active piece, clear rows, score, and spawn the next piece
    fn lock_piece(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };

        self.board.lock_piece(&piece, self.position);

        let cleared = self.board.clear_full_rows().len();
        let points = calculate_line_score(cleared);

        if cleared > 0 {
            self.score = self.score.saturating_add(points);
            self.lines = self.lines.saturating_add(cleared as u32);
            self.combo = self.combo.saturating_add(1);
        } else {
            self.combo = 0;
        }

        let spawned = self.spawn_piece();

        self.last_event = Some(LockEvent {
            lines_cleared: cleared as u32,
            points,
            combo: self.combo,
            game_over: !spawned,
        });
    }

    /// Take and clear the last lock event.
    pub fn take_last_event(&mut self) -> Option<LockEvent> {
        self.last_event.take()
    }

    /// Advance the gravity timer by `elapsed_ms`.
    ///
    /// Each time the level's drop interval elapses the piece falls one row.
    /// Returns true if a gravity step was performed.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.phase != GamePhase::Active {
            return false;
        }

        self.drop_timer_ms = self.drop_timer_ms.saturating_add(elapsed_ms);
        if self.drop_timer_ms < self.drop_interval_ms() {
            return false;
        }

        self.drop_timer_ms = 0;
        self.step();
        true
    }

    /// Apply a player intent. Returns true if the state changed.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::MoveLeft => self.try_move(-1),
            GameAction::MoveRight => self.try_move(1),
            GameAction::SoftDrop => {
                let was_active = self.is_active();
                self.soft_drop(true);
                was_active
            }
            GameAction::HardDrop => {
                let was_active = self.is_active();
                self.hard_drop();
                was_active
            }
            GameAction::Rotate => self.try_rotate(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

    fn started(kind: PieceKind) -> GameState {
        let mut state = GameState::new(12345);
        assert!(state.start());
        state.active = Some(Piece::new(kind));
        state.position = SPAWN_POSITION;
        state
    }

    /// Fill row `y` except for columns in `gaps`
    fn fill_row_except(board: &mut Board, y: i8, gaps: std::ops::RangeInclusive<i8>) {
        for x in 0..BOARD_WIDTH as i8 {
            if !gaps.contains(&x) {
                board.set(x, y, Some(PieceKind::Z));
            }
        }
    }

    #[test]
    fn test_new_game_state_is_idle() {
        let state = GameState::new(12345);
        assert_eq!(state.phase(), GamePhase::Idle);
        assert!(state.active().is_none());
        assert_eq!(state.score(), 0);
        assert_eq!(state.level(), 1);
        assert_eq!(state.final_result(), None);
    }

    #[test]
    fn test_start_spawns_at_center() {
        let mut state = GameState::new(12345);
        assert!(state.start());
        assert!(state.is_active());
        assert!(state.active().is_some());
        assert_eq!(state.position(), Position::new(4, 0));
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let mut state = started(PieceKind::T);
        state.score = 42;
        assert!(!state.start());
        assert_eq!(state.score(), 42);
    }

    #[test]
    fn test_actions_ignored_when_idle() {
        let mut state = GameState::new(1);
        assert!(!state.apply_action(GameAction::MoveLeft));
        assert!(!state.apply_action(GameAction::HardDrop));
        assert!(!state.tick(10_000));
        assert_eq!(state.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_move_blocked_by_wall() {
        let mut state = started(PieceKind::O);
        let mut moves = 0;
        while state.try_move(-1) {
            moves += 1;
        }
        assert_eq!(moves, 4);
        assert_eq!(state.position().x, 0);
        assert!(!state.try_move(-1));
    }

    #[test]
    fn test_rotate_rejected_when_colliding() {
        let mut state = started(PieceKind::I);
        state.position = Position::new(3, 17);

        // Vertical I would need rows 17..=20.
        assert!(!state.try_rotate());
        assert_eq!(state.active().unwrap().shape.rows(), 1);

        state.position = Position::new(3, 10);
        assert!(state.try_rotate());
        assert_eq!(state.active().unwrap().shape.rows(), 4);
    }

    #[test]
    fn test_soft_drop_awards_point_only_when_flagged() {
        let mut state = started(PieceKind::T);
        assert!(state.soft_drop(false));
        assert_eq!(state.score(), 0);
        assert!(state.soft_drop(true));
        assert_eq!(state.score(), 1);
        assert_eq!(state.position().y, 2);
    }

    #[test]
    fn test_soft_drop_locks_at_floor() {
        let mut state = started(PieceKind::O);
        state.position = Position::new(0, BOARD_HEIGHT as i8 - 2);

        assert!(!state.soft_drop(false));
        assert_eq!(state.board().get(0, 19), Some(Some(PieceKind::O)));
        assert_eq!(state.board().get(1, 18), Some(Some(PieceKind::O)));
        assert!(state.is_active());
        assert_eq!(state.position(), SPAWN_POSITION);
    }

    #[test]
    fn test_hard_drop_single_line_clear() {
        let mut state = started(PieceKind::I);
        fill_row_except(&mut state.board, 19, 4..=7);

        let distance = state.hard_drop();
        assert_eq!(distance, 19);
        assert_eq!(state.lines(), 1);
        assert_eq!(state.score(), 1);
        assert_eq!(state.combo(), 1);
        assert_eq!(state.board().filled_count(), 0);

        let event = state.take_last_event().unwrap();
        assert_eq!(event.lines_cleared, 1);
        assert_eq!(event.points, 1);
        assert!(!event.game_over);
    }

    #[test]
    fn test_hard_drop_four_line_clear() {
        let mut state = started(PieceKind::I);
        assert!(state.try_rotate());
        for y in 16..20 {
            fill_row_except(&mut state.board, y, 4..=4);
        }

        state.hard_drop();
        assert_eq!(state.lines(), 4);
        assert_eq!(state.score(), 12);
        assert_eq!(state.board().filled_count(), 0);
    }

    #[test]
    fn test_combo_resets_on_lock_without_clear() {
        let mut state = started(PieceKind::I);
        fill_row_except(&mut state.board, 19, 4..=7);
        state.hard_drop();
        assert_eq!(state.combo(), 1);

        state.active = Some(Piece::new(PieceKind::O));
        state.position = SPAWN_POSITION;
        state.hard_drop();
        assert_eq!(state.combo(), 0);
        assert_eq!(state.score(), 1);
        assert_eq!(state.take_last_event().unwrap().points, 0);
    }

    #[test]
    fn test_game_over_freezes_result() {
        let mut state = started(PieceKind::I);
        state.score = 730;
        state.lines = 12;
        for y in 1..BOARD_HEIGHT as i8 {
            fill_row_except(&mut state.board, y, 0..=0);
        }

        assert_eq!(state.hard_drop(), 0);
        assert!(state.is_over());
        assert!(state.active().is_none());
        assert_eq!(
            state.final_result(),
            Some(GameResult {
                score: 730,
                lines: 12,
                level: 2,
            })
        );
        assert!(state.take_last_event().unwrap().game_over);

        // Terminal: intents are ignored.
        assert!(!state.apply_action(GameAction::MoveRight));
        assert!(!state.tick(5_000));
    }

    #[test]
    fn test_restart_after_game_over_resets_counters() {
        let mut state = started(PieceKind::I);
        state.score = 1200;
        state.lines = 30;
        state.combo = 3;
        for y in 1..BOARD_HEIGHT as i8 {
            fill_row_except(&mut state.board, y, 0..=0);
        }
        state.hard_drop();
        assert!(state.is_over());

        assert!(state.start());
        assert!(state.is_active());
        assert_eq!(state.score(), 0);
        assert_eq!(state.lines(), 0);
        assert_eq!(state.combo(), 0);
        assert_eq!(state.level(), 1);
        assert_eq!(state.final_result(), None);
        assert_eq!(state.board().filled_count(), 0);
        assert_eq!(state.games_started(), 2);
    }

    #[test]
    fn test_tick_gravity_uses_level_interval() {
        let mut state = started(PieceKind::T);
        assert!(!state.tick(799));
        assert_eq!(state.position().y, 0);
        assert!(state.tick(1));
        assert_eq!(state.position().y, 1);

        state.score = 1000; // level 3 -> 700ms
        assert_eq!(state.drop_interval_ms(), 700);
        assert!(!state.tick(699));
        assert!(state.tick(1));
        assert_eq!(state.position().y, 2);
    }

    #[test]
    fn test_level_tracks_score() {
        let mut state = started(PieceKind::T);
        state.score = 499;
        assert_eq!(state.level(), 1);
        state.score = 500;
        assert_eq!(state.level(), 2);
    }

    #[test]
    fn test_display_board_overlays_active_piece() {
        let state = started(PieceKind::O);
        let display = state.display_board();
        assert_eq!(display.filled_count(), 4);
        assert_eq!(display.get(4, 0), Some(Some(PieceKind::O)));
        assert_eq!(state.board().filled_count(), 0);
    }
}
