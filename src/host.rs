//! Services the layout core consumes from its host.
//!
//! The browser implementations live in `wasm`; tests use in-memory fakes.

use crate::layout::{Margins, Point, Size};
use crate::model::NodeId;

/// A node's visual element.
pub trait VisualElement {
    /// Whether the element is in the document and can be measured.
    fn is_attached(&self) -> bool;

    /// Append the element to the diagram surface.
    fn attach(&mut self);

    /// Remove the element from the document.
    fn remove(&mut self);

    /// Outer size of the element, margins included.
    fn outer_size(&self) -> Size;

    fn margins(&self) -> Margins;

    /// Border-box position relative to the container.
    fn position(&self) -> Point;

    /// Move the border box to an absolute page offset.
    fn set_offset(&mut self, offset: Point);
}

/// The element the nodes are laid out in.
pub trait Container {
    /// Absolute page offset of the container's origin.
    fn offset(&self) -> Point;

    fn height(&self) -> f64;

    fn set_height(&mut self, height: f64);
}

/// Redraws connector lines.
pub trait ConnectorRepaint {
    /// Repaint every connection now.
    fn repaint_all(&mut self);
}

/// Turns node elements into drag sources. The host reports drag moves back
/// through `NodeLayoutController::on_drag`.
pub trait DragService {
    fn make_draggable(&mut self, node: &NodeId, handle: &str);
}
