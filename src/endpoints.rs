//! Endpoint groups for a node.
//!
//! A node type declares an ordered schema of endpoint groups. Each entry
//! names the model attribute holding the group's endpoint data and, if given,
//! the endpoint kind the group's endpoints default to. The schema is resolved
//! once, when the group is built.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PlumbingError, Result};
use crate::model::{Model, NodeId};
use crate::view::NodeViewConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointKind(pub String);

impl From<&str> for EndpointKind {
    fn from(s: &str) -> Self {
        EndpointKind(s.to_string())
    }
}

/// One declared endpoint group: `{"attr": ...}` or `{"attr": ..., "type": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaEntry {
    Typed {
        attr: String,
        #[serde(rename = "type")]
        kind: EndpointKind,
    },
    Attr {
        attr: String,
    },
}

impl SchemaEntry {
    pub fn new(attr: &str) -> Self {
        SchemaEntry::Attr { attr: attr.to_string() }
    }

    pub fn typed(attr: &str, kind: &str) -> Self {
        SchemaEntry::Typed {
            attr: attr.to_string(),
            kind: kind.into(),
        }
    }

    pub fn attr(&self) -> &str {
        match self {
            SchemaEntry::Typed { attr, .. } | SchemaEntry::Attr { attr } => attr,
        }
    }

    pub fn kind(&self) -> Option<&EndpointKind> {
        match self {
            SchemaEntry::Typed { kind, .. } => Some(kind),
            SchemaEntry::Attr { .. } => None,
        }
    }
}

/// Where a node type's schema comes from.
#[derive(Clone)]
pub enum EndpointSchema {
    Static(Vec<SchemaEntry>),
    /// Evaluated against the node's model when the group is built.
    Dynamic(Rc<dyn Fn(&Model) -> Vec<SchemaEntry>>),
}

impl Default for EndpointSchema {
    fn default() -> Self {
        EndpointSchema::Static(vec![SchemaEntry::new("endpoints")])
    }
}

impl fmt::Debug for EndpointSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSchema::Static(entries) => f.debug_tuple("Static").field(entries).finish(),
            EndpointSchema::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl EndpointSchema {
    /// Resolve to an ordered list of group specs, rejecting malformed entries.
    pub fn resolve(&self, model: &Model) -> Result<Vec<EndpointGroupSpec>> {
        let entries = match self {
            EndpointSchema::Static(entries) => entries.clone(),
            EndpointSchema::Dynamic(f) => f(model),
        };

        let mut specs: Vec<EndpointGroupSpec> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let key = entry.attr().trim();
            if key.is_empty() {
                return Err(PlumbingError::SchemaResolution {
                    index,
                    reason: "missing attr".to_string(),
                });
            }
            if specs.iter().any(|s| s.key == key) {
                return Err(PlumbingError::SchemaResolution {
                    index,
                    reason: format!("duplicate group '{}'", key),
                });
            }
            specs.push(EndpointGroupSpec {
                key: key.to_string(),
                kind: entry.kind().cloned(),
            });
        }
        Ok(specs)
    }
}

/// A resolved schema entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointGroupSpec {
    pub key: String,
    /// Default kind for the group's endpoints.
    pub kind: Option<EndpointKind>,
}

/// Everything an endpoint factory gets to build one endpoint view.
#[derive(Debug)]
pub struct EndpointSpec<'a> {
    pub node: &'a NodeId,
    pub group: &'a str,
    pub id: String,
    pub kind: Option<EndpointKind>,
    pub data: Value,
    pub options: &'a Map<String, Value>,
}

pub trait EndpointView {
    fn id(&self) -> &str;
    fn render(&mut self);
    fn destroy(&mut self);
}

pub trait EndpointCollection {
    fn key(&self) -> &str;
    fn kind(&self) -> Option<&EndpointKind>;
    fn add(&mut self, view: Box<dyn EndpointView>);
    /// Destroy and drop the view with this id.
    fn remove(&mut self, id: &str) -> bool;
    fn get(&self, id: &str) -> Option<&dyn EndpointView>;
    fn ids(&self) -> Vec<String>;
    fn len(&self) -> usize;
    fn render(&mut self);
    /// Destroy every owned view and empty the collection.
    fn destroy(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_all(&mut self, views: Vec<Box<dyn EndpointView>>) {
        for view in views {
            self.add(view);
        }
    }

    fn remove_all(&mut self, ids: &[&str]) -> usize {
        ids.iter().filter(|id| self.remove(id)).count()
    }
}

pub type EndpointFactory = Rc<dyn Fn(&EndpointSpec<'_>) -> Box<dyn EndpointView>>;
pub type CollectionFactory = Rc<dyn Fn(&EndpointGroupSpec) -> Box<dyn EndpointCollection>>;

/// Default sub-collection: views kept in insertion order.
pub struct SubviewCollection {
    spec: EndpointGroupSpec,
    views: Vec<Box<dyn EndpointView>>,
}

impl SubviewCollection {
    pub fn new(spec: EndpointGroupSpec) -> Self {
        Self { spec, views: Vec::new() }
    }

    pub fn factory() -> CollectionFactory {
        Rc::new(|spec: &EndpointGroupSpec| -> Box<dyn EndpointCollection> {
            Box::new(SubviewCollection::new(spec.clone()))
        })
    }
}

impl EndpointCollection for SubviewCollection {
    fn key(&self) -> &str {
        &self.spec.key
    }

    fn kind(&self) -> Option<&EndpointKind> {
        self.spec.kind.as_ref()
    }

    fn add(&mut self, view: Box<dyn EndpointView>) {
        if self.views.iter().any(|v| v.id() == view.id()) {
            // Same id again replaces the old view.
            self.remove(view.id());
        }
        self.views.push(view);
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.views.iter().position(|v| v.id() == id) {
            Some(i) => {
                self.views.remove(i).destroy();
                true
            }
            None => false,
        }
    }

    fn get(&self, id: &str) -> Option<&dyn EndpointView> {
        self.views.iter().find(|v| v.id() == id).map(|v| v.as_ref())
    }

    fn ids(&self) -> Vec<String> {
        self.views.iter().map(|v| v.id().to_string()).collect()
    }

    fn len(&self) -> usize {
        self.views.len()
    }

    fn render(&mut self) {
        for view in &mut self.views {
            view.render();
        }
    }

    fn destroy(&mut self) {
        for mut view in self.views.drain(..) {
            view.destroy();
        }
    }
}

/// All endpoint collections of one node, in schema order.
///
/// The schema is fixed at construction; the endpoints in each collection
/// follow the model through `sync`.
pub struct EndpointCollectionGroup {
    node: NodeId,
    collections: Vec<Box<dyn EndpointCollection>>,
    endpoint_factory: EndpointFactory,
    endpoint_options: Map<String, Value>,
}

impl EndpointCollectionGroup {
    pub fn new(model: &Model, config: &NodeViewConfig) -> Result<Self> {
        let specs = config.schema.resolve(model)?;
        let collections = specs
            .iter()
            .map(|spec| (config.collection_factory)(spec))
            .collect();

        let mut group = Self {
            node: model.id(),
            collections,
            endpoint_factory: Rc::clone(&config.endpoint_factory),
            endpoint_options: config.endpoint_options.clone(),
        };
        group.sync(model);
        Ok(group)
    }

    /// Bring every collection in line with its model attribute: views whose
    /// endpoint is gone are destroyed, new endpoints get a view. Views for
    /// endpoints still present are kept as they are.
    pub fn sync(&mut self, model: &Model) {
        for collection in &mut self.collections {
            let key = collection.key().to_string();
            let group_kind = collection.kind().cloned();
            let wanted: Vec<(String, Value)> = endpoint_data(model.get(&key))
                .into_iter()
                .enumerate()
                .map(|(index, data)| (endpoint_id(&self.node, &key, index, &data), data))
                .collect();

            let stale: Vec<String> = collection
                .ids()
                .into_iter()
                .filter(|id| !wanted.iter().any(|(w, _)| w == id))
                .collect();
            for id in &stale {
                collection.remove(id);
            }

            let present = collection.ids();
            let mut added = 0;
            for (id, data) in wanted {
                if present.contains(&id) {
                    continue;
                }
                let kind = data
                    .get("type")
                    .and_then(Value::as_str)
                    .map(EndpointKind::from)
                    .or_else(|| group_kind.clone());
                let view = (self.endpoint_factory)(&EndpointSpec {
                    node: &self.node,
                    group: &key,
                    id,
                    kind,
                    data,
                    options: &self.endpoint_options,
                });
                collection.add(view);
                added += 1;
            }

            debug!(
                node = %self.node,
                group = %key,
                added,
                removed = stale.len(),
                endpoints = collection.len(),
                "endpoint group synced"
            );
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn get(&self, key: &str) -> Option<&dyn EndpointCollection> {
        self.collections.iter().find(|c| c.key() == key).map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut (dyn EndpointCollection + 'static)> {
        self.collections.iter_mut().find(|c| c.key() == key).map(|c| c.as_mut())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.key()).collect()
    }

    /// Total number of endpoints across all groups.
    pub fn len(&self) -> usize {
        self.collections.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render(&mut self) {
        for collection in &mut self.collections {
            collection.render();
        }
    }

    pub fn destroy(&mut self) {
        for collection in &mut self.collections {
            collection.destroy();
        }
    }
}

/// Absent or null data is an empty group, an array is one endpoint per item,
/// anything else is a single endpoint.
fn endpoint_data(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

fn endpoint_id(node: &NodeId, group: &str, index: usize, data: &Value) -> String {
    match data.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => format!("{}:{}:{}", node, group, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct Log(Vec<String>);

    struct RecordingEndpoint {
        id: String,
        log: Rc<RefCell<Log>>,
    }

    impl EndpointView for RecordingEndpoint {
        fn id(&self) -> &str {
            &self.id
        }

        fn render(&mut self) {
            self.log.borrow_mut().0.push(format!("render {}", self.id));
        }

        fn destroy(&mut self) {
            self.log.borrow_mut().0.push(format!("destroy {}", self.id));
        }
    }

    fn config(log: &Rc<RefCell<Log>>, schema: Vec<SchemaEntry>) -> NodeViewConfig {
        let log = Rc::clone(log);
        NodeViewConfig::new(Rc::new(move |spec: &EndpointSpec<'_>| -> Box<dyn EndpointView> {
            Box::new(RecordingEndpoint { id: spec.id.clone(), log: Rc::clone(&log) })
        }))
        .with_schema(EndpointSchema::Static(schema))
    }

    #[test]
    fn test_schema_entry_json() {
        let json = r#"[{"attr": "endpoints"}, {"attr": "choices", "type": "choice"}]"#;
        let entries: Vec<SchemaEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0], SchemaEntry::new("endpoints"));
        assert_eq!(entries[1], SchemaEntry::typed("choices", "choice"));
        assert_eq!(entries[1].kind(), Some(&EndpointKind::from("choice")));
    }

    #[test]
    fn test_missing_attr_is_schema_error() {
        let log = Rc::new(RefCell::new(Log::default()));
        let cfg = config(&log, vec![SchemaEntry::new("endpoints"), SchemaEntry::new("  ")]);
        let err = EndpointCollectionGroup::new(&Model::new("n"), &cfg).err().unwrap();
        assert!(matches!(err, PlumbingError::SchemaResolution { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_attr_is_schema_error() {
        let log = Rc::new(RefCell::new(Log::default()));
        let cfg = config(&log, vec![SchemaEntry::new("a"), SchemaEntry::typed("a", "x")]);
        assert!(EndpointCollectionGroup::new(&Model::new("n"), &cfg).is_err());
    }

    #[test]
    fn test_absent_attribute_gives_empty_group() {
        let log = Rc::new(RefCell::new(Log::default()));
        let cfg = config(&log, vec![SchemaEntry::new("endpoints")]);
        let mut group = EndpointCollectionGroup::new(&Model::new("n"), &cfg).unwrap();

        assert_eq!(group.keys(), vec!["endpoints"]);
        assert!(group.is_empty());
        group.render();
        assert!(log.borrow().0.is_empty());
    }

    #[test]
    fn test_groups_render_in_schema_order() {
        let log = Rc::new(RefCell::new(Log::default()));
        let model = Model::new("n");
        model.set_silent("outputs", json!([{"id": "out1"}, {"id": "out2"}]));
        model.set_silent("input", json!({"id": "in"}));
        let schema = vec![SchemaEntry::new("input"), SchemaEntry::typed("outputs", "choice")];
        let cfg = config(&log, schema);

        let mut group = EndpointCollectionGroup::new(&model, &cfg).unwrap();
        assert_eq!(group.len(), 3);
        group.render();
        assert_eq!(log.borrow().0, vec!["render in", "render out1", "render out2"]);
    }

    #[test]
    fn test_generated_ids_and_kinds() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let factory: EndpointFactory =
            Rc::new(move |spec: &EndpointSpec<'_>| -> Box<dyn EndpointView> {
                s.borrow_mut().push((spec.id.clone(), spec.kind.clone()));
                Box::new(RecordingEndpoint { id: spec.id.clone(), log: Rc::default() })
            });
        let schema = EndpointSchema::Static(vec![SchemaEntry::typed("ends", "choice")]);
        let cfg = NodeViewConfig::new(factory).with_schema(schema);

        let model = Model::new("n");
        model.set_silent("ends", json!([{"label": "a"}, {"label": "b", "type": "exit"}]));
        EndpointCollectionGroup::new(&model, &cfg).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                ("n:ends:0".to_string(), Some(EndpointKind::from("choice"))),
                ("n:ends:1".to_string(), Some(EndpointKind::from("exit"))),
            ]
        );
    }

    #[test]
    fn test_endpoint_options_reach_factory() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut options = Map::new();
        options.insert("anchor".to_string(), json!("Right"));
        let factory: EndpointFactory =
            Rc::new(move |spec: &EndpointSpec<'_>| -> Box<dyn EndpointView> {
                let anchor = spec.options.get("anchor").cloned();
                s.borrow_mut().push((spec.node.clone(), spec.group.to_string(), anchor));
                Box::new(RecordingEndpoint { id: spec.id.clone(), log: Rc::default() })
            });
        let cfg = NodeViewConfig::new(factory).with_endpoint_options(options);

        let model = Model::new("n");
        model.set_silent("endpoints", json!({"id": "only"}));
        let group = EndpointCollectionGroup::new(&model, &cfg).unwrap();

        assert_eq!(group.get("endpoints").unwrap().ids(), vec!["only"]);
        assert_eq!(
            *seen.borrow(),
            vec![(NodeId::from("n"), "endpoints".to_string(), Some(json!("Right")))]
        );
    }

    #[test]
    fn test_sync_follows_model_endpoints() {
        let log = Rc::new(RefCell::new(Log::default()));
        let model = Model::new("n");
        model.set_silent("endpoints", json!([{"id": "e1"}, {"id": "e2"}]));
        let cfg = config(&log, vec![SchemaEntry::new("endpoints")]);
        let mut group = EndpointCollectionGroup::new(&model, &cfg).unwrap();

        model.set_silent("endpoints", json!([{"id": "e2"}, {"id": "e3"}]));
        group.sync(&model);
        assert_eq!(group.get("endpoints").unwrap().ids(), vec!["e2", "e3"]);
        assert_eq!(log.borrow().0, vec!["destroy e1"]);

        model.set_silent("endpoints", Value::Null);
        group.sync(&model);
        assert!(group.is_empty());
        assert_eq!(log.borrow().0, vec!["destroy e1", "destroy e2", "destroy e3"]);
    }

    #[test]
    fn test_dynamic_schema_uses_model() {
        let log = Rc::new(RefCell::new(Log::default()));
        let cfg = config(&log, vec![]).with_schema(EndpointSchema::Dynamic(Rc::new(|m: &Model| {
            if m.has("choices") {
                vec![SchemaEntry::new("entry"), SchemaEntry::typed("choices", "choice")]
            } else {
                vec![SchemaEntry::new("entry")]
            }
        })));

        let model = Model::new("n");
        model.set_silent("choices", json!([]));
        let group = EndpointCollectionGroup::new(&model, &cfg).unwrap();
        assert_eq!(group.keys(), vec!["entry", "choices"]);
        assert_eq!(group.get("choices").unwrap().kind(), Some(&EndpointKind::from("choice")));
    }

    #[test]
    fn test_collection_add_remove_destroy() {
        let log = Rc::new(RefCell::new(Log::default()));
        let model = Model::new("n");
        model.set_silent("endpoints", json!([{"id": "a"}]));
        let cfg = config(&log, vec![SchemaEntry::new("endpoints")]);
        let mut group = EndpointCollectionGroup::new(&model, &cfg).unwrap();

        let extra: Vec<Box<dyn EndpointView>> = vec![
            Box::new(RecordingEndpoint { id: "b".into(), log: Rc::clone(&log) }),
            Box::new(RecordingEndpoint { id: "c".into(), log: Rc::clone(&log) }),
        ];
        let endpoints = group.get_mut("endpoints").unwrap();
        endpoints.add_all(extra);
        assert_eq!(endpoints.ids(), vec!["a", "b", "c"]);
        assert!(endpoints.remove("b"));
        assert!(!endpoints.remove("missing"));
        assert_eq!(endpoints.remove_all(&["a", "zzz"]), 1);
        assert!(endpoints.get("c").is_some());

        group.destroy();
        assert!(group.is_empty());
        assert_eq!(log.borrow().0, vec!["destroy b", "destroy a", "destroy c"]);
    }

    #[test]
    fn test_custom_collection_factory() {
        struct Counting {
            inner: SubviewCollection,
        }

        impl EndpointCollection for Counting {
            fn key(&self) -> &str {
                self.inner.key()
            }

            fn kind(&self) -> Option<&EndpointKind> {
                self.inner.kind()
            }

            fn add(&mut self, view: Box<dyn EndpointView>) {
                self.inner.add(view)
            }

            fn remove(&mut self, id: &str) -> bool {
                self.inner.remove(id)
            }

            fn get(&self, id: &str) -> Option<&dyn EndpointView> {
                self.inner.get(id)
            }

            fn ids(&self) -> Vec<String> {
                self.inner.ids()
            }

            fn len(&self) -> usize {
                self.inner.len() + 100
            }

            fn render(&mut self) {
                self.inner.render()
            }

            fn destroy(&mut self) {
                self.inner.destroy()
            }
        }

        let log = Rc::new(RefCell::new(Log::default()));
        let cfg = config(&log, vec![SchemaEntry::new("endpoints")]).with_collection_factory(Rc::new(
            |spec: &EndpointGroupSpec| -> Box<dyn EndpointCollection> {
                Box::new(Counting { inner: SubviewCollection::new(spec.clone()) })
            },
        ));
        let group = EndpointCollectionGroup::new(&Model::new("n"), &cfg).unwrap();
        assert_eq!(group.len(), 100);
    }
}
