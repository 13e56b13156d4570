//! Full-row detection and collapse.

use crate::board::{Board, GridError};
use crate::resolve::Resolution;

/// Indices of every fully occupied row, bottom to top.
pub fn full_rows(board: &Board) -> Vec<usize> {
    (0..board.height()).filter(|&row| board.row_is_full(row)).collect()
}

/// Remove the bottom-most of `full` and shift everything above it down one
/// row. Only one row is removed: the rest of `full` is stale afterwards, so
/// callers re-query with `full_rows`. Returns false if `full` is empty.
pub fn collapse(board: &mut Board, full: &[usize], tally: &mut Resolution) -> Result<bool, GridError> {
    let Some(&row) = full.iter().min() else {
        return Ok(false);
    };
    let removed = board.remove_row(row)?;
    let points = removed.iter().map(|t| u64::from(t.value())).sum();
    tally.record_row(row, points);
    Ok(true)
}

/// Collapse until no row is full. Returns the number of rows removed.
pub fn resolve(board: &mut Board, tally: &mut Resolution) -> Result<usize, GridError> {
    let bound = board.height();
    let mut removed = 0;
    loop {
        let full = full_rows(board);
        if !collapse(board, &full, tally)? {
            return Ok(removed);
        }
        removed += 1;
        if removed > bound {
            return Err(GridError::NoConvergence {
                stage: "row collapse",
                bound,
            });
        }
    }
}
