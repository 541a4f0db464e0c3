//! Node models: an attribute store with change notifications.
//!
//! A `Model` is a cheap handle (`Rc`) shared by the node view, the endpoint
//! group and whoever feeds data in. Listeners are registered explicitly and
//! must be removed by the owner that added them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable unique identifier of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ChangeListener = Rc<dyn Fn(&Model, &str)>;

struct ModelInner {
    id: NodeId,
    attrs: Map<String, Value>,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
    next_subscription: u64,
}

#[derive(Clone)]
pub struct Model {
    inner: Rc<RefCell<ModelInner>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Model")
            .field("id", &inner.id)
            .field("attrs", &inner.attrs)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Model {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self::with_attrs(id, Map::new())
    }

    pub fn with_attrs(id: impl Into<NodeId>, attrs: Map<String, Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ModelInner {
                id: id.into(),
                attrs,
                listeners: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.borrow().id.clone()
    }

    pub fn get(&self, attr: &str) -> Option<Value> {
        self.inner.borrow().attrs.get(attr).cloned()
    }

    pub fn has(&self, attr: &str) -> bool {
        self.inner.borrow().attrs.contains_key(attr)
    }

    /// Set an attribute and notify listeners if the value changed.
    pub fn set(&self, attr: &str, value: Value) {
        if self.store(attr, value) {
            self.notify(attr);
        }
    }

    /// Set an attribute without notifying anyone.
    pub fn set_silent(&self, attr: &str, value: Value) {
        self.store(attr, value);
    }

    /// Register a change listener. The returned id must be handed back to
    /// `unsubscribe` when the subscriber goes away.
    pub fn subscribe(&self, listener: impl Fn(&Model, &str) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sid, _)| *sid != id);
        inner.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Returns true if the stored value actually changed.
    fn store(&self, attr: &str, value: Value) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.attrs.get(attr) == Some(&value) {
            return false;
        }
        inner.attrs.insert(attr.to_string(), value);
        true
    }

    fn notify(&self, attr: &str) {
        // Listeners may read (or write) the model, so release the borrow first.
        let listeners: Vec<ChangeListener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(self, attr);
        }
    }
}
