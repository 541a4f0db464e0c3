//! Per-node layout coordinates, created lazily.
//!
//! The first writer wins: a node gets its coordinates either from a `layout`
//! attribute already on its model, or from the grid. After that the entry only
//! changes through drag updates. Grid placements and drag updates are
//! mirrored onto the model's `layout` attribute without notifying it.

use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, warn};

use super::{GridAllocator, Layout, Size};
use crate::error::{PlumbingError, Result};
use crate::host::VisualElement;
use crate::model::{Model, NodeId};

/// Model attribute that may carry a persisted position.
pub const LAYOUT_ATTR: &str = "layout";

#[derive(Debug, Clone)]
pub struct LayoutStore {
    grid: GridAllocator,
    layouts: HashMap<NodeId, Layout>,
}

impl LayoutStore {
    pub fn new(num_cols: usize) -> Self {
        Self {
            grid: GridAllocator::new(num_cols),
            layouts: HashMap::new(),
        }
    }

    pub fn grid(&self) -> &GridAllocator {
        &self.grid
    }

    pub fn get(&self, node: &NodeId) -> Option<Layout> {
        self.layouts.get(node).copied()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.layouts.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Return the node's layout, creating it on first use.
    ///
    /// Grid placement measures the element, so a detached element is an
    /// `InvalidState` error rather than a zero-size cell.
    pub fn ensure_layout(
        &mut self,
        model: &Model,
        element: &dyn VisualElement,
    ) -> Result<Layout> {
        let id = model.id();
        if let Some(layout) = self.layouts.get(&id) {
            return Ok(*layout);
        }

        let layout = match model.get(LAYOUT_ATTR) {
            Some(value) if !value.is_null() => {
                let layout: Layout = serde_json::from_value(value).map_err(|e| {
                    warn!(node = %id, error = %e, "rejecting layout attribute");
                    e
                })?;
                debug!(node = %id, x = layout.x, y = layout.y, "layout seeded from model");
                layout
            }
            _ => {
                let layout = self.allocate(&id, element)?;
                write_layout(model, layout);
                layout
            }
        };

        self.layouts.insert(id, layout);
        Ok(layout)
    }

    /// Overwrite a node's layout with a drag-reported position.
    ///
    /// Nothing is notified: the node already moved on screen.
    pub fn update_layout(&mut self, model: &Model, coords: Layout) {
        write_layout(model, coords);
        self.layouts.insert(model.id(), coords);
    }

    /// Drop a destroyed node's entry. The grid keeps its cursor.
    pub fn forget(&mut self, node: &NodeId) -> Option<Layout> {
        self.layouts.remove(node)
    }

    fn allocate(&mut self, id: &NodeId, element: &dyn VisualElement) -> Result<Layout> {
        if !element.is_attached() {
            return Err(PlumbingError::InvalidState {
                node: id.clone(),
                reason: "element is not attached, render it before asking for its layout"
                    .to_string(),
            });
        }

        let margins = element.margins();
        let outer = element.outer_size();
        let cell = self.grid.add(Size {
            width: outer.width - margins.left,
            height: outer.height - margins.top,
        });

        Ok(Layout {
            x: cell.x + margins.left,
            y: cell.y + margins.top,
        })
    }
}

fn write_layout(model: &Model, layout: Layout) {
    model.set_silent(LAYOUT_ATTR, json!({ "x": layout.x, "y": layout.y }));
}
