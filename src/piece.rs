//! Active piece: shape, rotation, anchor, and collision-checked moves.

use crate::board::{Board, Pos, Tile};
use std::ops::RangeInclusive;

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// 4 cells relative to origin (0,0); each (dx, dy) with dy growing downward.
    pub fn cells(&self) -> &[(i8, i8); 4] {
        match self {
            Self::I => &[(0, 0), (1, 0), (2, 0), (3, 0)],
            Self::O => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::T => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::S => &[(1, 0), (2, 0), (0, 1), (1, 1)],
            Self::Z => &[(0, 0), (1, 0), (1, 1), (2, 1)],
            Self::J => &[(0, 0), (0, 1), (1, 1), (2, 1)],
            Self::L => &[(2, 0), (0, 1), (1, 1), (2, 1)],
        }
    }

    /// Distinct orientations: O has one, I/S/Z two, the rest four.
    pub fn rotation_states(&self) -> u8 {
        match self {
            Self::O => 1,
            Self::I | Self::S | Self::Z => 2,
            Self::T | Self::J | Self::L => 4,
        }
    }

    fn pivot(&self) -> (i8, i8) {
        match self {
            Self::I => (1, 0),
            _ => (1, 1),
        }
    }

    /// (dx, dy) offsets for a rotation index.
    pub fn offsets(&self, rotation: u8) -> [(i16, i16); 4] {
        let r = rotation % self.rotation_states();
        let (cx, cy) = self.pivot();
        let mut out = [(0i16, 0i16); 4];
        for (slot, (dx, dy)) in out.iter_mut().zip(self.cells()) {
            *slot = rotate_cell(*dx, *dy, r, cx, cy);
        }
        out
    }

    /// Anchor columns at which every spawn-orientation cell is on the board.
    pub fn spawn_band(&self, width: usize) -> RangeInclusive<i32> {
        let offsets = self.offsets(0);
        let lo = offsets.iter().map(|o| o.0).min().unwrap_or(0) as i32;
        let hi = offsets.iter().map(|o| o.0).max().unwrap_or(0) as i32;
        -lo..=(width as i32 - 1 - hi)
    }
}

fn rotate_cell(dx: i8, dy: i8, r: u8, cx: i8, cy: i8) -> (i16, i16) {
    let dx = i16::from(dx - cx);
    let dy = i16::from(dy - cy);
    let (dx, dy) = match r {
        0 => (dx, dy),
        1 => (-dy, dx),
        2 => (-dx, -dy),
        3 => (dy, -dx),
        _ => (dx, dy),
    };
    (dx + i16::from(cx), dy + i16::from(cy))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Down,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => (0, -1),
            Self::Right => (0, 1),
            Self::Down => (-1, 0),
        }
    }
}

/// Falling piece. The anchor is the board position of offset (0, 0); a cell
/// at offset (dx, dy) sits at row `anchor.row - dy`, col `anchor.col + dx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: TetrominoKind,
    pub rotation: u8,
    pub anchor: Pos,
    /// Tile value carried by each cell, in `TetrominoKind::cells` order.
    pub values: [u32; 4],
}

impl ActivePiece {
    pub fn new(kind: TetrominoKind, anchor: Pos, values: [u32; 4]) -> Self {
        Self {
            kind,
            rotation: 0,
            anchor,
            values,
        }
    }

    fn cells_for(&self, anchor: Pos, rotation: u8) -> [Pos; 4] {
        self.kind
            .offsets(rotation)
            .map(|(dx, dy)| anchor.offset(-i32::from(dy), i32::from(dx)))
    }

    /// Board positions of the four cells.
    pub fn cells(&self) -> [Pos; 4] {
        self.cells_for(self.anchor, self.rotation)
    }

    /// Legal iff every cell is inside horizontally, not below the floor, and
    /// not on an occupied cell. Cells above the top row are always allowed.
    pub fn fits(cells: &[Pos], board: &Board) -> bool {
        cells.iter().all(|p| {
            p.col >= 0
                && (p.col as usize) < board.width()
                && p.row >= 0
                && !board.is_occupied(p.row, p.col)
        })
    }

    /// Move one cell. Returns false and leaves the piece untouched when the
    /// target is illegal; a failed `Down` means the piece has landed.
    pub fn try_move(&mut self, direction: Direction, board: &Board) -> bool {
        let (d_row, d_col) = direction.delta();
        let anchor = self.anchor.offset(d_row, d_col);
        if !Self::fits(&self.cells_for(anchor, self.rotation), board) {
            return false;
        }
        self.anchor = anchor;
        true
    }

    /// Advance to the next orientation. No wall kicks: an illegal rotation is
    /// rejected. Shapes with a single orientation never rotate.
    pub fn try_rotate(&mut self, board: &Board) -> bool {
        let states = self.kind.rotation_states();
        if states == 1 {
            return false;
        }
        let next = (self.rotation + 1) % states;
        if !Self::fits(&self.cells_for(self.anchor, next), board) {
            return false;
        }
        self.rotation = next;
        true
    }

    /// The tiles this piece becomes on landing.
    pub fn landed_tiles(&self) -> impl Iterator<Item = (Pos, Tile)> + '_ {
        self.cells()
            .into_iter()
            .zip(self.values)
            .map(|(pos, value)| (pos, Tile::new(value)))
    }
}
