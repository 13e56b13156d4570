//! Board: fixed-size tile matrix, occupancy queries, landing.
//!
//! Row 0 is the floor; rows grow upward. Tiles do not record their own
//! position: a tile's position is always the slot it is stored in.

use thiserror::Error;

/// Grid coordinate. Signed so that piece cells above the top row or left of
/// column 0 can be expressed before they are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }
}

/// A landed numbered tile. Values are powers of two, starting at 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    value: u32,
}

impl Tile {
    pub fn new(value: u32) -> Self {
        debug_assert!(value >= 2 && value.is_power_of_two(), "tile value {value}");
        Self { value }
    }

    #[inline]
    pub fn value(self) -> u32 {
        self.value
    }

    /// The tile that survives merging two tiles of this value.
    #[inline]
    pub fn doubled(self) -> Self {
        Self {
            value: self.value.saturating_mul(2),
        }
    }

    /// 0 for 2, 1 for 4, 2 for 8, ... (palette index).
    #[inline]
    pub fn rank(self) -> u8 {
        self.value.trailing_zeros().saturating_sub(1) as u8
    }
}

/// Consolidation pipeline faults. None of these is reachable from valid play;
/// each one means the pipeline itself is broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("label {label} refers to an equivalence class that was never allocated")]
    UnallocatedLabel { label: u32 },
    #[error("row {row} is outside a board of height {height}")]
    RowOutOfRange { row: usize, height: usize },
    #[error("free tile at row {row}, col {col} cannot drop: target is blocked")]
    BlockedDrop { row: usize, col: usize },
    #[error("{stage} did not settle within {bound} passes")]
    NoConvergence { stage: &'static str, bound: usize },
}

/// Playfield: width × height optional tiles, row-major, row 0 at the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Option<Tile>>,
    game_over: bool,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
            game_over: false,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Bounds check, no side effects.
    pub fn is_inside(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// False for anything outside the grid, so piece cells still above the
    /// top row never collide.
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        self.is_inside(row, col) && self.get(row as usize, col as usize).is_some()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells[self.index(row, col)]
    }

    #[cfg(test)]
    pub fn tile_at(&self, pos: Pos) -> Option<Tile> {
        if !self.is_inside(pos.row, pos.col) {
            return None;
        }
        self.get(pos.row as usize, pos.col as usize)
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, tile: Option<Tile>) {
        let i = self.index(row, col);
        self.cells[i] = tile;
    }

    #[inline]
    pub(crate) fn take(&mut self, row: usize, col: usize) -> Option<Tile> {
        let i = self.index(row, col);
        self.cells[i].take()
    }

    /// Write a landed piece into the grid. Any tile whose target lies outside
    /// the grid (above the top row) sets the game-over flag and is dropped.
    /// Returns the sticky game-over status.
    pub fn place<I>(&mut self, tiles: I) -> bool
    where
        I: IntoIterator<Item = (Pos, Tile)>,
    {
        for (pos, tile) in tiles {
            if self.is_inside(pos.row, pos.col) {
                self.set(pos.row as usize, pos.col as usize, Some(tile));
            } else {
                self.game_over = true;
            }
        }
        self.game_over
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Empty every cell and clear the game-over flag.
    pub fn reset(&mut self) {
        self.cells.fill(None);
        self.game_over = false;
    }

    pub fn row_is_full(&self, row: usize) -> bool {
        row < self.height && (0..self.width).all(|col| self.get(row, col).is_some())
    }

    /// Remove `row` and shift every row above it down by one; the top row
    /// becomes empty. Returns the removed tiles.
    pub(crate) fn remove_row(&mut self, row: usize) -> Result<Vec<Tile>, GridError> {
        if row >= self.height {
            return Err(GridError::RowOutOfRange {
                row,
                height: self.height,
            });
        }
        let start = self.index(row, 0);
        let removed = self.cells[start..start + self.width]
            .iter()
            .flatten()
            .copied()
            .collect();
        self.cells.copy_within(start + self.width.., start);
        let top = self.index(self.height - 1, 0);
        self.cells[top..].fill(None);
        Ok(removed)
    }

    /// Every occupied cell in raster order (bottom row first, left to right).
    pub fn tiles(&self) -> impl Iterator<Item = (Pos, Tile)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.map(|tile| {
                let pos = Pos::new((i / self.width) as i32, (i % self.width) as i32);
                (pos, tile)
            })
        })
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Build a board from a picture, top row first. Each line holds one
    /// whitespace-separated token per column: `.` for empty or a tile value.
    #[cfg(test)]
    pub fn from_picture(lines: &[&str]) -> Self {
        let height = lines.len();
        let width = lines.first().map_or(0, |l| l.split_whitespace().count());
        let mut board = Self::new(width, height);
        for (i, line) in lines.iter().enumerate() {
            let row = height - 1 - i;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            assert_eq!(tokens.len(), width, "ragged picture line {i}: {line:?}");
            for (col, token) in tokens.into_iter().enumerate() {
                if token != "." {
                    let value = token.parse().expect("tile value");
                    board.set(row, col, Some(Tile::new(value)));
                }
            }
        }
        board
    }

    /// Inverse of `from_picture`.
    #[cfg(test)]
    pub fn to_picture(&self) -> Vec<String> {
        (0..self.height)
            .rev()
            .map(|row| {
                (0..self.width)
                    .map(|col| {
                        self.get(row, col)
                            .map_or_else(|| ".".to_string(), |t| t.value().to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}
