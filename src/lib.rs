//! Layout core for the plumbing (state diagram) view.
//!
//! Places states on a row-major grid until the user drags them, keeps the
//! diagram container tall enough for its states, repaints connectors as
//! states move, and manages the schema-declared endpoint groups of each state.

pub mod endpoints;
pub mod error;
pub mod host;
pub mod layout;
pub mod model;
pub mod view;
mod wasm;

#[cfg(test)]
mod testing;

pub use endpoints::{
    EndpointCollection, EndpointCollectionGroup, EndpointKind, EndpointSchema, EndpointSpec,
    EndpointView, SchemaEntry, SubviewCollection,
};
pub use error::{PlumbingError, Result};
pub use layout::{
    GridAllocator, Layout, LayoutConfig, LayoutStore, NodeLayoutController, RepaintEvent,
};
pub use model::{Model, NodeId};
pub use view::{NodeView, NodeViewCollection, NodeViewConfig};
pub use wasm::DiagramLayout;
