//! Piece supply: a precomputed run of random shapes, refilled when it runs
//! low, plus spawn column and tile values. The RNG is injected so that the
//! board logic stays deterministic under test.

use crate::board::Pos;
use crate::piece::{ActivePiece, TetrominoKind};
use rand::Rng;
use std::collections::VecDeque;

/// Shapes generated per refill.
pub const SEQUENCE_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct PieceSupply<R> {
    queue: VecDeque<TetrominoKind>,
    rng: R,
}

impl<R: Rng> PieceSupply<R> {
    pub fn new(rng: R) -> Self {
        let mut supply = Self {
            queue: VecDeque::with_capacity(SEQUENCE_LEN * 2),
            rng,
        };
        supply.refill();
        supply
    }

    fn refill(&mut self) {
        for _ in 0..SEQUENCE_LEN {
            let i = self.rng.random_range(0..TetrominoKind::ALL.len());
            self.queue.push_back(TetrominoKind::ALL[i]);
        }
    }

    /// Next shape. Keeps at least one more queued for the preview.
    pub fn next_kind(&mut self) -> TetrominoKind {
        if self.queue.len() < 2 {
            self.refill();
        }
        self.queue.pop_front().unwrap_or(TetrominoKind::O)
    }

    /// The shape `next_kind` will return.
    pub fn peek(&self) -> Option<TetrominoKind> {
        self.queue.front().copied()
    }

    /// A new piece above the visible grid at a random legal column, each cell
    /// carrying a 2 or a 4.
    pub fn spawn(&mut self, width: usize, height: usize) -> ActivePiece {
        let kind = self.next_kind();
        let col = self.rng.random_range(kind.spawn_band(width));
        let mut values = [2u32; 4];
        for v in &mut values {
            *v = if self.rng.random_bool(0.5) { 2 } else { 4 };
        }
        ActivePiece::new(kind, Pos::new(height as i32 + 1, col), values)
    }
}
