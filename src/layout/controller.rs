//! Positions node views in their container and keeps connectors in step
//! while nodes are dragged.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{Layout, LayoutConfig, LayoutStore, Point};
use crate::error::{PlumbingError, Result};
use crate::host::{ConnectorRepaint, Container, DragService, VisualElement};
use crate::model::NodeId;
use crate::view::{NodeView, NodeViewCollection};

/// Emitted after every repaint cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepaintEvent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type RepaintListener = Box<dyn FnMut(&RepaintEvent)>;

pub struct NodeLayoutController {
    config: LayoutConfig,
    store: LayoutStore,
    nodes: NodeViewCollection,
    container: Box<dyn Container>,
    connectors: Box<dyn ConnectorRepaint>,
    listeners: Vec<(ListenerId, RepaintListener)>,
    next_listener: u64,
    /// Nodes already handed to the drag service.
    draggable: HashSet<NodeId>,
}

impl NodeLayoutController {
    pub fn new(
        nodes: NodeViewCollection,
        container: Box<dyn Container>,
        connectors: Box<dyn ConnectorRepaint>,
        config: LayoutConfig,
    ) -> Self {
        Self {
            store: LayoutStore::new(config.num_cols),
            config,
            nodes,
            container,
            connectors,
            listeners: Vec::new(),
            next_listener: 0,
            draggable: HashSet::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn nodes(&self) -> &NodeViewCollection {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeViewCollection {
        &mut self.nodes
    }

    /// Lay out every node in collection order. Nodes must already be
    /// rendered (attached), or their first layout fails.
    pub fn render_all(&mut self) -> Result<()> {
        let views: Vec<Rc<RefCell<NodeView>>> = self.nodes.iter().cloned().collect();
        for view in &views {
            self.render_node(view)?;
        }
        debug!(nodes = views.len(), height = self.container.height(), "layout rendered");
        Ok(())
    }

    pub fn ensure_layout(&mut self, id: &NodeId) -> Result<Layout> {
        let view = self.view(id)?;
        let node = view.borrow();
        self.store.ensure_layout(node.model(), node.element())
    }

    /// Absolute page offset of container-relative coordinates.
    pub fn offset_of(&self, coords: Layout) -> Point {
        let origin = self.container.offset();
        Point {
            x: origin.x + coords.x,
            y: origin.y + coords.y,
        }
    }

    /// Grow the container to fit the node's margin box. Never shrinks it.
    pub fn resize_to_fit(&mut self, id: &NodeId) -> Result<()> {
        let view = self.view(id)?;
        let node = view.borrow();
        self.fit(node.element());
        Ok(())
    }

    /// Redraw every connection, then notify repaint listeners.
    ///
    /// Repaints all connections rather than only those touching a moved node;
    /// fine for the handful of connections a diagram has.
    pub fn repaint(&mut self) {
        self.connectors.repaint_all();
        for (_, listener) in &mut self.listeners {
            listener(&RepaintEvent);
        }
        trace!("connectors repainted");
    }

    /// Handle one drag-move of a node: record its new position, repaint the
    /// connectors, then grow the container. There is no rollback.
    pub fn on_drag(&mut self, id: &NodeId) -> Result<()> {
        let view = self.view(id)?;
        let position = view.borrow().element().position();
        trace!(node = %id, x = position.x, y = position.y, "node dragged");

        self.store.update_layout(view.borrow().model(), position);
        self.repaint();
        self.fit(view.borrow().element());
        Ok(())
    }

    /// Make every node draggable by its configured handle. A node is
    /// registered once; later calls only pick up nodes added since.
    pub fn init_dragging(&mut self, drag: &mut dyn DragService) {
        for view in self.nodes.iter() {
            let view = view.borrow();
            if self.draggable.insert(view.id().clone()) {
                drag.make_draggable(view.id(), &self.config.drag_handle);
            }
        }
    }

    pub fn on_repaint(&mut self, listener: impl FnMut(&RepaintEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn off_repaint(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Remove a node, destroy its view and forget its layout.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Rc<RefCell<NodeView>>> {
        let view = self.nodes.remove(id)?;
        view.borrow_mut().destroy();
        self.store.forget(id);
        self.draggable.remove(id);
        Some(view)
    }

    fn render_node(&mut self, view: &Rc<RefCell<NodeView>>) -> Result<()> {
        let mut node = view.borrow_mut();
        let layout = self.store.ensure_layout(node.model(), node.element())?;
        let offset = self.offset_of(layout);
        node.element_mut().set_offset(offset);
        self.fit(node.element());
        Ok(())
    }

    fn fit(&mut self, element: &dyn VisualElement) {
        let top = element.position().y - element.margins().top;
        let bottom = top + element.outer_size().height;
        let height = self.container.height().max(bottom);
        self.container.set_height(height);
    }

    fn view(&self, id: &NodeId) -> Result<Rc<RefCell<NodeView>>> {
        self.nodes
            .get(id)
            .ok_or_else(|| PlumbingError::UnknownNode(id.clone()))
    }
}
