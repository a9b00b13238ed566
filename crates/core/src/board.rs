//! Board module - manages the game grid
//!
//! The board is a 10x20 grid where each cell is empty or holds the color tag
//! (piece kind) of the piece that locked there.
//! Uses a flat array for cache locality and zero allocation.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).

use arrayvec::ArrayVec;

use crate::pieces::{Piece, Position};
use crate::types::{Cell, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

/// Total number of cells on the board
const BOARD_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

/// Row indices cleared by one pass (at most every row)
pub type ClearedRows = ArrayVec<usize, { BOARD_HEIGHT as usize }>;

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is within bounds and filled
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return false;
        }
        let start = y * BOARD_WIDTH as usize;
        let end = start + BOARD_WIDTH as usize;
        self.cells[start..end].iter().all(|cell| cell.is_some())
    }

    /// Test whether `piece` placed at `pos` collides.
    ///
    /// A cell collides when it is left/right of the board, below the floor, or
    /// on an occupied cell. Cells above the top edge (negative row) only collide
    /// with the side walls.
    pub fn collides(&self, piece: &Piece, pos: Position) -> bool {
        for (dx, dy) in piece.shape.filled_cells() {
            let x = pos.x + dx;
            let y = pos.y + dy;

            if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
                return true;
            }

            if y >= 0 && self.is_occupied(x, y) {
                return true;
            }
        }
        false
    }

    /// Stamp the piece's cells with its color tag.
    ///
    /// Out-of-range cells are skipped; callers are expected to have checked
    /// `collides` first.
    pub fn lock_piece(&mut self, piece: &Piece, pos: Position) {
        for (dx, dy) in piece.shape.filled_cells() {
            self.set(pos.x + dx, pos.y + dy, Some(piece.kind));
        }
    }

    /// Return a copy of this board with the piece merged in
    pub fn merge(&self, piece: &Piece, pos: Position) -> Board {
        let mut merged = self.clone();
        merged.lock_piece(piece, pos);
        merged
    }

    /// Clear all full rows and return the row indices that were cleared (bottom to top).
    ///
    /// Rows are compacted downward with a two-pointer scan and the freed rows at the
    /// top are emptied, so the board keeps its height. A board without full rows is
    /// left untouched.
    pub fn clear_full_rows(&mut self) -> ClearedRows {
        let mut cleared_rows = ClearedRows::new();
        let width = BOARD_WIDTH as usize;
        let mut write_y = BOARD_HEIGHT as usize;

        for read_y in (0..BOARD_HEIGHT as usize).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * width;
                    let dst_start = write_y * width;
                    self.cells
                        .copy_within(src_start..src_start + width, dst_start);
                }
            }
        }

        for cell in &mut self.cells[..write_y * width] {
            *cell = None;
        }

        cleared_rows
    }

    /// Functional form of [`Board::clear_full_rows`]: `(board', rows_cleared)`
    pub fn cleared(&self) -> (Board, usize) {
        let mut board = self.clone();
        let rows = board.clear_full_rows().len();
        (board, rows)
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate over rows as slices, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(BOARD_WIDTH as usize)
    }

    /// Number of occupied cells
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Fill an entire row with `kind` (test and bench helper)
    pub fn fill_row(&mut self, y: i8, kind: PieceKind) {
        for x in 0..BOARD_WIDTH as i8 {
            self.set(x, y, Some(kind));
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::get_shape;

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(9, 0), Some(9));
        assert_eq!(Board::index(0, 1), Some(10));
        assert_eq!(Board::index(9, 19), Some(199));
        assert_eq!(Board::index(-1, 0), None);
        assert_eq!(Board::index(10, 0), None);
        assert_eq!(Board::index(0, 20), None);
    }

    #[test]
    fn test_collides_above_top_only_checks_walls() {
        let mut board = Board::new();
        board.fill_row(0, PieceKind::Z);

        // I piece (1 row) at y = -1 sits entirely above the board.
        let piece = Piece::new(PieceKind::I);
        assert!(!board.collides(&piece, Position::new(3, -1)));
        // ...but still hits the side walls.
        assert!(board.collides(&piece, Position::new(-1, -1)));
        assert!(board.collides(&piece, Position::new(7, -1)));
    }

    #[test]
    fn test_lock_piece_skips_out_of_range_cells() {
        let mut board = Board::new();
        let piece = Piece {
            kind: PieceKind::O,
            shape: get_shape(PieceKind::O),
        };
        board.lock_piece(&piece, Position::new(9, -1));

        // Only (9, 0) lands on the board.
        assert_eq!(board.filled_count(), 1);
        assert_eq!(board.get(9, 0), Some(Some(PieceKind::O)));
    }

    #[test]
    fn test_clear_rows_reports_bottom_to_top() {
        let mut board = Board::new();
        board.fill_row(19, PieceKind::I);
        board.fill_row(17, PieceKind::I);
        board.set(0, 18, Some(PieceKind::T));

        let cleared = board.clear_full_rows();
        assert_eq!(cleared.as_slice(), &[19, 17]);
        assert_eq!(board.get(0, 19), Some(Some(PieceKind::T)));
        assert_eq!(board.filled_count(), 1);
    }
}
