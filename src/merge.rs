//! Vertical 2048-style merging of equal tiles.

use crate::board::{Board, GridError, Pos};
use crate::resolve::Resolution;

/// One bottom-up pass. For every vertically stacked pair of equal tiles the
/// lower tile doubles and the upper one is consumed, leaving its cell empty.
/// Pairs are visited from the floor upward, so in a run of three equal tiles
/// the lower pair merges first.
pub fn resolve_once(board: &mut Board, tally: &mut Resolution) -> bool {
    let mut merged = false;
    for row in 0..board.height().saturating_sub(1) {
        for col in 0..board.width() {
            let (Some(lower), Some(upper)) = (board.get(row, col), board.get(row + 1, col)) else {
                continue;
            };
            if lower.value() != upper.value() {
                continue;
            }
            let survivor = lower.doubled();
            board.set(row, col, Some(survivor));
            board.set(row + 1, col, None);
            tally.record_merge(Pos::new(row as i32, col as i32), survivor.value());
            merged = true;
        }
    }
    merged
}

/// Repeat `resolve_once` until a pass merges nothing. Returns the number of
/// passes that merged something.
pub fn resolve(board: &mut Board, tally: &mut Resolution) -> Result<usize, GridError> {
    // Every merge removes a tile.
    let bound = board.tile_count() + 1;
    let mut passes = 0;
    while resolve_once(board, tally) {
        passes += 1;
        if passes > bound {
            return Err(GridError::NoConvergence {
                stage: "merge",
                bound,
            });
        }
    }
    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_equal_tiles_merge_lower_pair_first() {
        let mut board = Board::from_picture(&[
            "2", //
            "2",
            "2",
        ]);
        let mut tally = Resolution::default();
        assert!(resolve_once(&mut board, &mut tally));
        assert_eq!(board.to_picture(), vec!["2", ".", "4"]);
        assert_eq!(tally.points, 4);
        assert!(!resolve_once(&mut board, &mut tally));
        assert_eq!(tally.points, 4);
    }

    #[test]
    fn chain_settles_over_two_passes() {
        let mut board = Board::from_picture(&[
            "2", //
            "2",
            "4",
        ]);
        let mut tally = Resolution::default();
        assert!(resolve_once(&mut board, &mut tally));
        assert_eq!(board.to_picture(), vec![".", "4", "4"]);
        assert_eq!(tally.points, 4);
        assert!(resolve_once(&mut board, &mut tally));
        assert_eq!(board.to_picture(), vec![".", ".", "8"]);
        assert_eq!(tally.points, 12);
        assert!(!resolve_once(&mut board, &mut tally));
        assert_eq!(tally.merges, 2);
    }

    #[test]
    fn pairs_in_one_pass_do_not_overlap() {
        let mut board = Board::from_picture(&["2 .", "2 8", "2 8", "2 ."]);
        let mut tally = Resolution::default();
        assert!(resolve_once(&mut board, &mut tally));
        assert_eq!(board.to_picture(), vec![". .", "4 .", ". 16", "4 ."]);
        assert_eq!(tally.points, 4 + 4 + 16);
    }

    #[test]
    fn horizontal_neighbours_never_merge() {
        let mut board = Board::from_picture(&["2 2 2"]);
        let mut tally = Resolution::default();
        assert!(!resolve_once(&mut board, &mut tally));
        assert_eq!(tally.points, 0);
    }

    #[test]
    fn resolve_runs_to_fixpoint() {
        let mut board = Board::from_picture(&[
            "2", //
            "2",
            "4",
            "8",
        ]);
        let mut tally = Resolution::default();
        let passes = resolve(&mut board, &mut tally).unwrap();
        assert_eq!(passes, 3);
        assert_eq!(board.to_picture(), vec![".", ".", ".", "16"]);
        assert_eq!(tally.points, 4 + 8 + 16);
        // Each survivor is consumed by the next merge; only the 16 is marked.
        assert_eq!(tally.merged_cells, vec![Pos::new(0, 0)]);
        assert_eq!(tally.merges, 3);
    }
}
