//! Row-major grid packing.
//!
//! Cells are handed out left-to-right, top-to-bottom, `num_cols` per row.
//! A row is as tall as its tallest cell; each cell in a row starts where the
//! previous one ended. Allocation is append-only: there is no removal and no
//! re-packing.

use tracing::debug;

use super::{Rect, Size};

#[derive(Debug, Clone)]
pub struct GridAllocator {
    num_cols: usize,
    /// Column the next cell goes into.
    col: usize,
    /// Y origin of the current row.
    row_top: f64,
    /// Tallest cell seen in the current row so far.
    row_height: f64,
    /// X origin of the next cell in the current row.
    next_x: f64,
    allocated: usize,
}

impl GridAllocator {
    pub fn new(num_cols: usize) -> Self {
        Self {
            num_cols: num_cols.max(1), // zero columns would never wrap
            col: 0,
            row_top: 0.0,
            row_height: 0.0,
            next_x: 0.0,
            allocated: 0,
        }
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of cells handed out so far.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Allocate the next cell for a box of the given size.
    pub fn add(&mut self, size: Size) -> Rect {
        if self.col == 0 {
            self.row_top += self.row_height;
            self.row_height = 0.0;
            self.next_x = 0.0;
        }

        let cell = Rect {
            x: self.next_x,
            y: self.row_top,
            width: size.width,
            height: size.height,
        };
        self.next_x += size.width;
        self.row_height = self.row_height.max(size.height);
        self.col = (self.col + 1) % self.num_cols;
        self.allocated += 1;

        debug!(x = cell.x, y = cell.y, w = cell.width, h = cell.height, "grid cell allocated");
        cell
    }
}
