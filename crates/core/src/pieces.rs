//! Pieces module - shape matrices and rotation
//!
//! Each piece is a small boolean occupancy matrix (at most 4x4). Rotation is a
//! plain transpose-and-reverse of that matrix; there are no wall kicks, so callers
//! must collision-check the rotated piece before committing it.

use crate::types::{PieceKind, Rgb};

/// Largest side of any shape matrix
pub const MAX_SHAPE_SIDE: usize = 4;

/// Row-major boolean occupancy matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: u8,
    cols: u8,
    cells: [[bool; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE],
}

impl Shape {
    /// Build a shape from rows of 0/1 values.
    ///
    /// Rows must all have the same length and fit in 4x4.
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        debug_assert!(!rows.is_empty() && rows.len() <= MAX_SHAPE_SIDE);
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        debug_assert!(cols <= MAX_SHAPE_SIDE);

        let mut cells = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        for (y, row) in rows.iter().enumerate().take(MAX_SHAPE_SIDE) {
            debug_assert_eq!(row.len(), cols);
            for (x, &v) in row.iter().enumerate().take(MAX_SHAPE_SIDE) {
                cells[y][x] = v != 0;
            }
        }

        Self {
            rows: rows.len().min(MAX_SHAPE_SIDE) as u8,
            cols: cols.min(MAX_SHAPE_SIDE) as u8,
            cells,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows as usize
    }

    pub fn cols(&self) -> usize {
        self.cols as usize
    }

    /// Occupancy at (row, col); false outside the matrix
    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < self.rows() && col < self.cols() && self.cells[row][col]
    }

    /// Iterate over occupied cells as (dx, dy) offsets
    pub fn filled_cells(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        (0..self.rows()).flat_map(move |y| {
            (0..self.cols())
                .filter(move |&x| self.cells[y][x])
                .map(move |x| (x as i8, y as i8))
        })
    }

    /// Rotate 90° clockwise: transpose, then reverse each row.
    ///
    /// `rotated[i][j] = original[rows - 1 - j][i]`
    pub fn rotated(&self) -> Self {
        let mut cells = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        let rows = self.rows();
        for (i, out_row) in cells.iter_mut().enumerate().take(self.cols()) {
            for (j, cell) in out_row.iter_mut().enumerate().take(rows) {
                *cell = self.cells[rows - 1 - j][i];
            }
        }

        Self {
            rows: self.cols,
            cols: self.rows,
            cells,
        }
    }
}

/// Spawn shape for a piece kind
pub fn get_shape(kind: PieceKind) -> Shape {
    match kind {
        PieceKind::I => Shape::from_rows(&[&[1, 1, 1, 1]]),
        PieceKind::O => Shape::from_rows(&[&[1, 1], &[1, 1]]),
        PieceKind::T => Shape::from_rows(&[&[0, 1, 0], &[1, 1, 1]]),
        PieceKind::S => Shape::from_rows(&[&[0, 1, 1], &[1, 1, 0]]),
        PieceKind::Z => Shape::from_rows(&[&[1, 1, 0], &[0, 1, 1]]),
        PieceKind::J => Shape::from_rows(&[&[1, 0, 0], &[1, 1, 1]]),
        PieceKind::L => Shape::from_rows(&[&[0, 0, 1], &[1, 1, 1]]),
    }
}

/// A piece: kind tag plus its current shape matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
}

impl Piece {
    /// Create a piece in its spawn orientation
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            shape: get_shape(kind),
        }
    }

    /// Color stamped into the board when this piece locks
    pub fn color(&self) -> Rgb {
        self.kind.color()
    }

    /// Return the piece rotated 90° clockwise.
    ///
    /// The result is not validated; check it with `Board::collides` first.
    pub fn rotated(&self) -> Self {
        Self {
            kind: self.kind,
            shape: self.shape.rotated(),
        }
    }
}

/// Board-relative position of a piece's top-left matrix corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Position shifted by (dx, dy)
    pub const fn offset(self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}
