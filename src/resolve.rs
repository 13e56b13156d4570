//! Landing resolution: merge, collapse, and gravity rounds until the board is
//! quiescent.
//!
//! A round runs each stage to its own fixpoint in order. A round can leave
//! work behind: a merge or a collapse can strand tiles, and a gravity drop can
//! line up new equal pairs. So rounds repeat until one changes nothing. The
//! first changing round is usually followed by a second one that picks up
//! what its gravity pass created; a third is rare but reachable.

use crate::board::{Board, GridError, Pos};
use crate::gravity::FreeMask;
use crate::{gravity, merge, rows};

/// What one landing resolution did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Merge values plus cleared row sums; feeds the score and speed ramp.
    pub points: u64,
    pub merges: u32,
    pub rows_cleared: u32,
    /// Single-row tile moves made by gravity.
    pub drops: usize,
    /// Rounds that changed the board.
    pub rounds: u32,
    /// Where the tiles produced by merges sit now. Kept in step with later
    /// collapses and drops; a merged tile that is cleared or merged away is
    /// removed.
    pub merged_cells: Vec<Pos>,
    /// Row index of each collapse, in collapse order.
    pub cleared_rows: Vec<usize>,
}

impl Resolution {
    /// `at` is the surviving lower cell; the cell above it was consumed.
    pub(crate) fn record_merge(&mut self, at: Pos, value: u32) {
        self.points += u64::from(value);
        self.merges += 1;
        let consumed = at.offset(1, 0);
        self.merged_cells.retain(|&p| p != consumed);
        if !self.merged_cells.contains(&at) {
            self.merged_cells.push(at);
        }
    }

    /// Row `row` was removed: merged tiles in it are gone, those above it
    /// moved down one row.
    pub(crate) fn record_row(&mut self, row: usize, points: u64) {
        self.points += points;
        self.rows_cleared += 1;
        self.cleared_rows.push(row);
        let row = row as i32;
        self.merged_cells.retain(|p| p.row != row);
        for p in &mut self.merged_cells {
            if p.row > row {
                p.row -= 1;
            }
        }
    }

    /// Every tile marked in `mask` is about to drop one row.
    pub(crate) fn record_drops(&mut self, mask: &FreeMask) {
        self.drops += mask.count();
        for p in &mut self.merged_cells {
            if p.row > 0 && mask.is_free(p.row as usize, p.col as usize) {
                p.row -= 1;
            }
        }
    }
}

/// A stage settles the board for one concern and reports how much work it did
/// (0 = nothing changed).
pub type Stage = fn(&mut Board, &mut Resolution) -> Result<usize, GridError>;

/// Merge, then collapse, then label + gravity.
pub const STAGES: [(&str, Stage); 3] = [
    ("merge", merge::resolve),
    ("collapse", rows::resolve),
    ("gravity", gravity::resolve),
];

/// Run `stages` in order, each to its fixpoint. Returns whether any changed
/// the board.
pub fn run_round(
    board: &mut Board,
    stages: &[(&str, Stage)],
    tally: &mut Resolution,
) -> Result<bool, GridError> {
    let mut changed = false;
    for &(name, stage) in stages {
        let work = stage(board, tally)?;
        if work > 0 {
            glog!("  {name}: {work}");
        }
        changed |= work > 0;
    }
    Ok(changed)
}

/// Repeat rounds of `stages` until a round changes nothing.
pub fn resolve_with(board: &mut Board, stages: &[(&str, Stage)]) -> Result<Resolution, GridError> {
    // Each changing round removes a tile or lowers one by at least a row.
    let bound = board.width() * board.height() * (board.height() + 1) + 1;
    let mut tally = Resolution::default();
    while run_round(board, stages, &mut tally)? {
        tally.rounds += 1;
        if tally.rounds as usize > bound {
            return Err(GridError::NoConvergence {
                stage: "resolution",
                bound,
            });
        }
    }
    Ok(tally)
}

/// Resolve a freshly landed piece until the board is quiescent.
pub fn resolve_until_quiescent(board: &mut Board) -> Result<Resolution, GridError> {
    resolve_with(board, &STAGES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Tile;
    use crate::labeling;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn quiet_board_takes_no_rounds() {
        let mut board = Board::from_picture(&[
            ". . .", //
            "4 . .",
            "2 8 .",
        ]);
        let before = board.clone();
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(tally, Resolution::default());
        assert_eq!(board, before);
    }

    #[test]
    fn gap_from_merge_is_closed_then_merged_again() {
        let mut board = Board::from_picture(&[
            "4 . .", //
            "2 . .",
            "2 . .",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". . .", ". . .", "8 . ."]);
        assert_eq!(tally.points, 12);
        assert_eq!(tally.merges, 2);
        assert_eq!(tally.rounds, 2);
        assert_eq!(tally.drops, 1);
    }

    #[test]
    fn some_boards_need_a_third_round() {
        let mut board = Board::from_picture(&[
            "8 . .", //
            "4 . .",
            "2 . .",
            "2 . .",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". . .", ". . .", ". . .", "16 . ."]);
        assert_eq!(tally.points, 4 + 8 + 16);
        assert_eq!(tally.rounds, 3);
    }

    #[test]
    fn collapse_strands_tiles_that_then_fall() {
        let mut board = Board::from_picture(&[
            ". 4 .", //
            "2 8 16",
            "32 . .",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". . .", ". . .", "32 4 ."]);
        assert_eq!(tally.points, 26);
        assert_eq!(tally.cleared_rows, vec![1]);
        assert_eq!(tally.drops, 1);
        assert_eq!(tally.rounds, 1);
    }

    #[test]
    fn merged_tile_is_tracked_as_it_falls() {
        let mut board = Board::from_picture(&[
            "2 .", //
            "2 .",
            ". .",
            "8 .",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". .", ". .", "4 .", "8 ."]);
        assert_eq!(tally.merged_cells, vec![Pos::new(1, 0)]);
    }

    #[test]
    fn merged_tile_moves_down_with_a_collapse() {
        let mut board = Board::from_picture(&[
            "2 .", //
            "2 .",
            "16 .",
            "4 8",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". .", ". .", "4 .", "16 ."]);
        assert_eq!(tally.points, 4 + 12);
        assert_eq!(tally.merged_cells, vec![Pos::new(1, 0)]);
    }

    #[test]
    fn merging_a_merged_tile_keeps_one_mark() {
        let mut board = Board::from_picture(&[
            "4 .", //
            "4 .",
            ". .",
            "8 .",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.to_picture(), vec![". .", ". .", ". .", "16 ."]);
        assert_eq!(tally.points, 8 + 16);
        assert_eq!(tally.merged_cells, vec![Pos::new(0, 0)]);
    }

    #[test]
    fn merged_tile_cleared_with_its_row_leaves_no_mark() {
        let mut board = Board::from_picture(&[
            "2 .", //
            "2 .",
            "4 8",
        ]);
        let tally = resolve_until_quiescent(&mut board).unwrap();
        assert_eq!(board.tile_count(), 0);
        assert_eq!(tally.points, 4 + 8 + 16);
        assert_eq!(tally.merges, 2);
        assert_eq!(tally.rows_cleared, 1);
        assert!(tally.merged_cells.is_empty());
    }

    #[test]
    fn stages_are_pluggable() {
        let mut board = Board::from_picture(&[
            "4 . .", //
            "2 . .",
            "2 . .",
        ]);
        let tally = resolve_with(&mut board, &STAGES[..1]).unwrap();
        assert_eq!(board.to_picture(), vec!["4 . .", ". . .", "4 . ."]);
        assert_eq!(tally.rounds, 1);
    }

    #[test]
    fn random_boards_always_reach_quiescence() {
        let mut rng = SmallRng::seed_from_u64(2048);
        for _ in 0..200 {
            let (w, h) = (rng.random_range(2..7), rng.random_range(2..9));
            let mut board = Board::new(w, h);
            for row in 0..h {
                for col in 0..w {
                    if rng.random_bool(0.5) {
                        let value = 2u32 << rng.random_range(0..3);
                        board.set(row, col, Some(Tile::new(value)));
                    }
                }
            }
            let tiles = board.tile_count();
            let tally = resolve_until_quiescent(&mut board).unwrap();

            assert!(board.tile_count() <= tiles);
            assert!(rows::full_rows(&board).is_empty());
            let labels = labeling::label(&board).unwrap();
            assert_eq!(gravity::identify_free(&labels).count(), 0);
            let mut again = Resolution::default();
            assert!(!merge::resolve_once(&mut board.clone(), &mut again));
            assert_eq!(tally.merges as usize + tally.rows_cleared as usize * w, tiles - board.tile_count());
            for (i, p) in tally.merged_cells.iter().enumerate() {
                assert!(board.tile_at(*p).is_some(), "merged cell {p:?} is empty");
                assert!(!tally.merged_cells[..i].contains(p));
            }
        }
    }
}
