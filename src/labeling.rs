//! Two-pass connected-component labeling over the occupancy grid.
//!
//! Pass 1 walks the grid in raster order starting at the floor row (left to
//! right, then upward). Each occupied cell looks at its two causal neighbours,
//! the cell below and the cell to the left. The floor itself acts as an
//! occupied neighbour below row 0 carrying the reserved label 1, so every
//! component that touches the floor joins label 1's class. Conflicting
//! neighbour labels are recorded in a "minimum equivalent label" table.
//!
//! Pass 2 renumbers the surviving classes consecutively from 1 and rewrites
//! every cell. The floor class is always the smallest, so label 1 means
//! "floor-anchored" and every floating component gets a label of 2 or more.

use crate::board::{Board, GridError};

/// Label of an empty cell.
pub const EMPTY: u32 = 0;
/// Label of every floor-anchored tile.
pub const FLOOR: u32 = 1;

/// Per-cell component labels, row-major with row 0 at the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    width: usize,
    labels: Vec<u32>,
    components: usize,
}

impl LabelGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        self.labels.len() / self.width.max(1)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.labels[row * self.width + col]
    }

    /// Distinct labels in use. All floor-anchored tiles share one label and
    /// count once.
    pub fn component_count(&self) -> usize {
        self.components
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }
}

/// Smallest label known to be equivalent to `label`.
fn class_of(min_equivalent: &[u32], label: u32) -> Result<u32, GridError> {
    label
        .checked_sub(1)
        .and_then(|i| min_equivalent.get(i as usize))
        .copied()
        .ok_or(GridError::UnallocatedLabel { label })
}

/// Fold the classes of `a` and `b` into whichever representative is smaller.
fn union(min_equivalent: &mut [u32], a: u32, b: u32) -> Result<(), GridError> {
    let ca = class_of(min_equivalent, a)?;
    let cb = class_of(min_equivalent, b)?;
    if ca == cb {
        return Ok(());
    }
    let keep = ca.min(cb);
    for entry in min_equivalent.iter_mut() {
        if *entry == ca || *entry == cb {
            *entry = keep;
        }
    }
    Ok(())
}

pub fn label(board: &Board) -> Result<LabelGrid, GridError> {
    let (width, height) = (board.width(), board.height());
    let mut labels = vec![EMPTY; width * height];
    // min_equivalent[l - 1] is the representative of label l; slot 0 is the floor.
    let mut min_equivalent: Vec<u32> = vec![FLOOR];

    for row in 0..height {
        for col in 0..width {
            if board.get(row, col).is_none() {
                continue;
            }
            let below = if row == 0 {
                FLOOR
            } else {
                labels[(row - 1) * width + col]
            };
            let left = if col == 0 {
                EMPTY
            } else {
                labels[row * width + col - 1]
            };
            labels[row * width + col] = match (below, left) {
                (EMPTY, EMPTY) => {
                    let fresh = min_equivalent.len() as u32 + 1;
                    min_equivalent.push(fresh);
                    fresh
                }
                (l, EMPTY) | (EMPTY, l) => l,
                (a, b) if a == b => a,
                (a, b) => {
                    union(&mut min_equivalent, a, b)?;
                    a.min(b)
                }
            };
        }
    }

    // Pass 2: consecutive canonical numbering of the representatives.
    let mut canonical = vec![EMPTY; min_equivalent.len() + 1];
    let mut representatives: Vec<u32> = min_equivalent.clone();
    representatives.sort_unstable();
    representatives.dedup();
    for (i, &rep) in representatives.iter().enumerate() {
        canonical[rep as usize] = i as u32 + 1;
    }
    let mut floor_used = false;
    for cell in labels.iter_mut().filter(|l| **l != EMPTY) {
        *cell = canonical[class_of(&min_equivalent, *cell)? as usize];
        floor_used |= *cell == FLOOR;
    }
    let components = representatives.len() - usize::from(!floor_used);

    Ok(LabelGrid {
        width,
        labels,
        components,
    })
}
