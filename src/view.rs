//! Node views: one per diagram state, owning its element and endpoints.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::endpoints::{
    CollectionFactory, EndpointCollectionGroup, EndpointFactory, EndpointSchema, SubviewCollection,
};
use crate::error::Result;
use crate::host::VisualElement;
use crate::model::{Model, NodeId, SubscriptionId};

/// Per node-type configuration: which endpoint groups exist and how their
/// views and collections are built.
#[derive(Clone)]
pub struct NodeViewConfig {
    pub schema: EndpointSchema,
    pub endpoint_factory: EndpointFactory,
    pub collection_factory: CollectionFactory,
    /// Passed to every endpoint the factory builds.
    pub endpoint_options: Map<String, Value>,
}

impl NodeViewConfig {
    pub fn new(endpoint_factory: EndpointFactory) -> Self {
        Self {
            schema: EndpointSchema::default(),
            endpoint_factory,
            collection_factory: SubviewCollection::factory(),
            endpoint_options: Map::new(),
        }
    }

    pub fn with_schema(mut self, schema: EndpointSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_collection_factory(mut self, factory: CollectionFactory) -> Self {
        self.collection_factory = factory;
        self
    }

    pub fn with_endpoint_options(mut self, options: Map<String, Value>) -> Self {
        self.endpoint_options = options;
        self
    }
}

pub struct NodeView {
    id: NodeId,
    model: Model,
    element: Box<dyn VisualElement>,
    endpoints: EndpointCollectionGroup,
    subscription: Option<SubscriptionId>,
}

impl NodeView {
    /// Build the view and subscribe it to its model: every model change
    /// refreshes the view until `destroy` is called.
    pub fn new(
        model: Model,
        element: Box<dyn VisualElement>,
        config: &NodeViewConfig,
    ) -> Result<Rc<RefCell<NodeView>>> {
        let endpoints = EndpointCollectionGroup::new(&model, config)?;
        let view = Rc::new(RefCell::new(NodeView {
            id: model.id(),
            model: model.clone(),
            element,
            endpoints,
            subscription: None,
        }));

        let weak = Rc::downgrade(&view);
        let subscription = model.subscribe(move |_, attr| {
            let Some(view) = weak.upgrade() else { return };
            // A change fired from inside the view's own borrow has already
            // been rendered by whoever holds it.
            match view.try_borrow_mut() {
                Ok(mut view) => view.refresh(),
                Err(_) => trace!(attr, "skipping re-entrant node render"),
            };
        });
        view.borrow_mut().subscription = Some(subscription);

        Ok(view)
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn element(&self) -> &dyn VisualElement {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> &mut dyn VisualElement {
        self.element.as_mut()
    }

    pub fn endpoints(&self) -> &EndpointCollectionGroup {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut EndpointCollectionGroup {
        &mut self.endpoints
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Attach the element to the diagram, then render the endpoints.
    pub fn render(&mut self) {
        self.element.attach();
        self.endpoints.render();
    }

    /// Re-read endpoint data from the model, then render. Endpoints that
    /// left the model are destroyed, new ones get a view.
    pub fn refresh(&mut self) {
        self.endpoints.sync(&self.model);
        self.render();
    }

    pub fn destroy(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.model.unsubscribe(subscription);
        }
        self.endpoints.destroy();
        self.element.remove();
    }
}

/// Ordered, id-indexed node views.
#[derive(Default)]
pub struct NodeViewCollection {
    views: Vec<Rc<RefCell<NodeView>>>,
    index: HashMap<NodeId, usize>,
}

impl NodeViewCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a view. A view with an id already present replaces the old one
    /// in place; the old view is destroyed before it is returned.
    pub fn add(&mut self, view: Rc<RefCell<NodeView>>) -> Option<Rc<RefCell<NodeView>>> {
        let id = view.borrow().id().clone();
        match self.index.get(&id) {
            Some(&i) => {
                let old = std::mem::replace(&mut self.views[i], view);
                old.borrow_mut().destroy();
                Some(old)
            }
            None => {
                self.index.insert(id, self.views.len());
                self.views.push(view);
                None
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<Rc<RefCell<NodeView>>> {
        self.index.get(id).map(|&i| Rc::clone(&self.views[i]))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<Rc<RefCell<NodeView>>> {
        let i = self.index.remove(id)?;
        let view = self.views.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(view)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<RefCell<NodeView>>> {
        self.views.iter()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.views.iter().map(|v| v.borrow().id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Render every view in collection order.
    pub fn render(&self) {
        for view in &self.views {
            view.borrow_mut().render();
        }
    }
}
