//! In-memory host services for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::host::{Container, ConnectorRepaint, DragService, VisualElement};
use crate::layout::{Margins, Point, Size};
use crate::model::NodeId;

#[derive(Debug, Default)]
pub struct ElementState {
    pub attached: bool,
    pub attach_count: usize,
    pub removed: bool,
    pub outer: Size,
    pub margins: Margins,
    /// Absolute page offset of the border box.
    pub offset: Point,
    /// Page offset of the container, used to derive `position`.
    pub origin: Point,
}

/// Element fake; clones share state so tests can inspect an element after
/// handing it to a view.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub state: Rc<RefCell<ElementState>>,
}

impl FakeElement {
    pub fn attached(width: f64, height: f64) -> Self {
        let el = Self::default();
        {
            let mut s = el.state.borrow_mut();
            s.attached = true;
            s.outer = Size { width, height };
        }
        el
    }

    /// Renders as `width` x `height` once attached.
    pub fn detached_sized(width: f64, height: f64) -> Self {
        let el = Self::attached(width, height);
        el.state.borrow_mut().attached = false;
        el
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn with_margins(self, margins: Margins) -> Self {
        self.state.borrow_mut().margins = margins;
        self
    }

    pub fn with_origin(self, origin: Point) -> Self {
        self.state.borrow_mut().origin = origin;
        self
    }

    /// Simulate the drag gesture moving the element.
    pub fn drag_to(&self, position: Point) {
        let mut s = self.state.borrow_mut();
        s.offset = Point { x: s.origin.x + position.x, y: s.origin.y + position.y };
    }
}

impl VisualElement for FakeElement {
    fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    fn attach(&mut self) {
        let mut s = self.state.borrow_mut();
        s.attached = true;
        s.attach_count += 1;
    }

    fn remove(&mut self) {
        let mut s = self.state.borrow_mut();
        s.attached = false;
        s.removed = true;
    }

    fn outer_size(&self) -> Size {
        self.state.borrow().outer
    }

    fn margins(&self) -> Margins {
        self.state.borrow().margins
    }

    fn position(&self) -> Point {
        let s = self.state.borrow();
        Point { x: s.offset.x - s.origin.x, y: s.offset.y - s.origin.y }
    }

    fn set_offset(&mut self, offset: Point) {
        self.state.borrow_mut().offset = offset;
    }
}

#[derive(Debug, Default)]
pub struct ContainerState {
    pub offset: Point,
    pub height: f64,
    pub heights: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeContainer {
    pub state: Rc<RefCell<ContainerState>>,
}

impl FakeContainer {
    pub fn at(offset: Point) -> Self {
        let c = Self::default();
        c.state.borrow_mut().offset = offset;
        c
    }

    pub fn height(&self) -> f64 {
        self.state.borrow().height
    }
}

impl Container for FakeContainer {
    fn offset(&self) -> Point {
        self.state.borrow().offset
    }

    fn height(&self) -> f64 {
        self.state.borrow().height
    }

    fn set_height(&mut self, height: f64) {
        let mut s = self.state.borrow_mut();
        s.height = height;
        s.heights.push(height);
    }
}

/// Records the order of repaints relative to other events in a shared log.
#[derive(Debug, Clone, Default)]
pub struct FakeRepaint {
    pub log: Rc<RefCell<Vec<String>>>,
}

impl FakeRepaint {
    pub fn count(&self) -> usize {
        self.log.borrow().iter().filter(|e| *e == "repaint_all").count()
    }
}

impl ConnectorRepaint for FakeRepaint {
    fn repaint_all(&mut self) {
        self.log.borrow_mut().push("repaint_all".to_string());
    }
}

#[derive(Debug, Default)]
pub struct FakeDrag {
    pub registered: Vec<(NodeId, String)>,
}

impl DragService for FakeDrag {
    fn make_draggable(&mut self, node: &NodeId, handle: &str) {
        self.registered.push((node.clone(), handle.to_string()));
    }
}
