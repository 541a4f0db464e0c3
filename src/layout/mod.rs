// layout/mod.rs
//
// Node layout for the plumbing view.
//
// Goals:
// - Deterministic: row-major grid packing, no randomness
// - Manual + auto: a node placed by the grid keeps that spot until dragged,
//   a dragged node keeps the dragged spot; the grid never revisits a node
// - Container grows to fit its nodes, never shrinks during a render pass
//
// Submodules:
// - grid: GridAllocator, append-only row-major cell packing
// - store: LayoutStore, lazy per-node coordinates
// - controller: NodeLayoutController, render / drag / resize / repaint
//
// Coordinates are container-relative pixels (f64, never rounded here).

use serde::{Deserialize, Serialize};

mod controller;
mod grid;
mod store;

pub use controller::{ListenerId, NodeLayoutController, RepaintEvent};
pub use grid::GridAllocator;
pub use store::{LayoutStore, LAYOUT_ATTR};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// An allocated grid cell.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Computed CSS margins of an element.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Persisted position of a node, relative to its container.
pub type Layout = Point;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Cells per grid row.
    pub num_cols: usize,
    /// Selector of the region that starts a drag.
    pub drag_handle: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            num_cols: 3,
            drag_handle: ".titlebar".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_overlaps() {
        let a = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = Rect { x: 10.0, y: 0.0, width: 10.0, height: 10.0 };
        let c = Rect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_config_partial_json() {
        let cfg: LayoutConfig = serde_json::from_str(r#"{"num_cols": 4}"#).unwrap();
        assert_eq!(cfg.num_cols, 4);
        assert_eq!(cfg.drag_handle, ".titlebar");
    }
}
