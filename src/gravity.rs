//! Dropping tiles that have no support chain to the floor.

use crate::board::{Board, GridError};
use crate::labeling::{self, LabelGrid, EMPTY, FLOOR};
use crate::resolve::Resolution;

/// Cells whose component is not floor-anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeMask {
    width: usize,
    free: Vec<bool>,
    count: usize,
}

impl FreeMask {
    #[inline]
    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.free[row * self.width + col]
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Mark every tile whose label is neither empty nor the floor's.
pub fn identify_free(labels: &LabelGrid) -> FreeMask {
    let free: Vec<bool> = labels
        .labels()
        .iter()
        .map(|&l| l != EMPTY && l != FLOOR)
        .collect();
    let count = free.iter().filter(|f| **f).count();
    FreeMask {
        width: labels.width(),
        free,
        count,
    }
}

/// Move every free tile down exactly one row. Rows are walked from the floor
/// up, so a free tile's target has already been vacated if it was free too.
pub fn apply_gravity(board: &mut Board, mask: &FreeMask) -> Result<usize, GridError> {
    let mut moved = 0;
    for row in 0..board.height() {
        for col in 0..board.width() {
            if !mask.is_free(row, col) {
                continue;
            }
            if row == 0 || board.get(row - 1, col).is_some() {
                return Err(GridError::BlockedDrop { row, col });
            }
            let tile = board.take(row, col);
            board.set(row - 1, col, tile);
            moved += 1;
        }
    }
    Ok(moved)
}

/// Label, drop, relabel until nothing is free. Returns the number of drop
/// passes.
pub fn resolve(board: &mut Board, tally: &mut Resolution) -> Result<usize, GridError> {
    // A tile can fall at most height - 1 rows.
    let bound = board.height();
    let mut passes = 0;
    loop {
        let labels = labeling::label(board)?;
        let mask = identify_free(&labels);
        if mask.count() == 0 {
            return Ok(passes);
        }
        glog!(
            "    drop pass {}: {} components, {} free tiles",
            passes + 1,
            labels.component_count(),
            mask.count()
        );
        apply_gravity(board, &mask)?;
        tally.record_drops(&mask);
        passes += 1;
        if passes > bound {
            return Err(GridError::NoConvergence {
                stage: "gravity",
                bound,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Tile;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn free_count(board: &Board) -> usize {
        identify_free(&labeling::label(board).unwrap()).count()
    }

    #[test]
    fn anchored_board_has_no_free_tiles() {
        let board = Board::from_picture(&[
            ". 4 .", //
            "2 2 .",
            ". 8 16",
        ]);
        assert_eq!(free_count(&board), 0);
    }

    #[test]
    fn floating_component_is_marked_whole() {
        let board = Board::from_picture(&[
            "2 2 .", //
            ". 4 .",
            ". . .",
            "8 . .",
        ]);
        let mask = identify_free(&labeling::label(&board).unwrap());
        assert_eq!(mask.count(), 3);
        assert!(mask.is_free(3, 0));
        assert!(mask.is_free(3, 1));
        assert!(mask.is_free(2, 1));
        assert!(!mask.is_free(0, 0));
    }

    #[test]
    fn single_application_moves_one_row() {
        let mut board = Board::from_picture(&[
            "2 2", //
            ". .",
            ". .",
        ]);
        let mask = identify_free(&labeling::label(&board).unwrap());
        assert_eq!(apply_gravity(&mut board, &mask).unwrap(), 2);
        assert_eq!(board.to_picture(), vec![". .", "2 2", ". ."]);
    }

    #[test]
    fn tall_structure_falls_to_the_floor() {
        let mut board = Board::from_picture(&[
            "4 .", //
            "2 8",
            ". .",
            ". .",
            ". .",
        ]);
        let mut tally = Resolution::default();
        assert_eq!(resolve(&mut board, &mut tally).unwrap(), 3);
        assert_eq!(board.to_picture(), vec![". .", ". .", ". .", "4 .", "2 8"]);
        assert_eq!(tally.drops, 9);
    }

    #[test]
    fn falling_group_stops_on_support() {
        let mut board = Board::from_picture(&[
            ". 2 2", //
            ". . .",
            ". . .",
            ". . 16",
        ]);
        let mut tally = Resolution::default();
        assert_eq!(resolve(&mut board, &mut tally).unwrap(), 2);
        assert_eq!(board.to_picture(), vec![". . .", ". . .", ". 2 2", ". . 16"]);
    }

    #[test]
    fn drop_into_occupied_cell_is_a_fault() {
        let mut board = Board::from_picture(&["2", "4"]);
        let labels = labeling::label(&Board::from_picture(&["2", "."])).unwrap();
        let mask = identify_free(&labels);
        assert_eq!(
            apply_gravity(&mut board, &mask),
            Err(GridError::BlockedDrop { row: 1, col: 0 })
        );
    }

    #[test]
    fn quiescence_is_stable_on_random_boards() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..200 {
            let (w, h) = (rng.random_range(1..7), rng.random_range(2..9));
            let mut board = Board::new(w, h);
            for row in 0..h {
                for col in 0..w {
                    if rng.random_bool(0.4) {
                        board.set(row, col, Some(Tile::new(2)));
                    }
                }
            }
            let tiles = board.tile_count();
            let mut tally = Resolution::default();
            let passes = resolve(&mut board, &mut tally).unwrap();
            assert!(passes < h, "{passes} passes on height {h}");
            assert_eq!(board.tile_count(), tiles);
            assert_eq!(free_count(&board), 0);
            assert_eq!(resolve(&mut board, &mut tally).unwrap(), 0);
        }
    }
}
