//! WASM bindings for the plumbing-core library.
//!
//! DOM-backed host services plus the `DiagramLayout` handle exposed to
//! JavaScript. Connector drawing, drag detection and endpoint markup stay on
//! the JS side; they are reached through the extern functions below.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CssStyleDeclaration, Document, HtmlElement};

use crate::endpoints::{EndpointFactory, EndpointSchema, EndpointSpec, EndpointView, SchemaEntry};
use crate::error::PlumbingError;
use crate::host::{ConnectorRepaint, Container, DragService, VisualElement};
use crate::layout::{LayoutConfig, Margins, NodeLayoutController, Point, Size};
use crate::model::{Model, NodeId};
use crate::view::{NodeView, NodeViewCollection, NodeViewConfig};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);

    #[wasm_bindgen(js_namespace = jsPlumb, js_name = repaintEverything)]
    fn repaint_everything();

    #[wasm_bindgen(js_namespace = plumbing, js_name = makeDraggable)]
    fn make_draggable(node: &str, handle: &str);

    #[wasm_bindgen(js_namespace = plumbing, js_name = renderEndpoint)]
    fn render_endpoint(node: &str, group: &str, endpoint: &str, kind: &str);

    #[wasm_bindgen(js_namespace = plumbing, js_name = destroyEndpoint)]
    fn destroy_endpoint(node: &str, endpoint: &str);
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn computed_style(el: &HtmlElement) -> Option<CssStyleDeclaration> {
    web_sys::window()?.get_computed_style(el).ok().flatten()
}

/// Pixel value of a computed style property, `0` when missing (like parseInt).
fn px(style: Option<&CssStyleDeclaration>, prop: &str) -> f64 {
    style
        .and_then(|s| s.get_property_value(prop).ok())
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Border-box offset of an element relative to the page.
fn page_offset(el: &HtmlElement) -> Point {
    let rect = el.get_bounding_client_rect();
    let window = web_sys::window();
    let scroll_x = window.as_ref().and_then(|w| w.scroll_x().ok()).unwrap_or(0.0);
    let scroll_y = window.as_ref().and_then(|w| w.scroll_y().ok()).unwrap_or(0.0);
    Point {
        x: rect.left() + scroll_x,
        y: rect.top() + scroll_y,
    }
}

fn set_px(el: &HtmlElement, prop: &str, value: f64) {
    if let Err(e) = el.style().set_property(prop, &format!("{}px", value)) {
        console_error(&format!("Error setting {}: {:?}", prop, e));
    }
}

/// A state's element, absolutely positioned inside the diagram container.
struct DomElement {
    el: HtmlElement,
    container: HtmlElement,
}

impl VisualElement for DomElement {
    fn is_attached(&self) -> bool {
        self.el.is_connected()
    }

    fn attach(&mut self) {
        if let Err(e) = self.container.append_child(&self.el) {
            console_error(&format!("Error attaching state: {:?}", e));
        }
    }

    fn remove(&mut self) {
        self.el.remove();
    }

    fn outer_size(&self) -> Size {
        let m = self.margins();
        Size {
            width: self.el.offset_width() as f64 + m.left + m.right,
            height: self.el.offset_height() as f64 + m.top + m.bottom,
        }
    }

    fn margins(&self) -> Margins {
        let style = computed_style(&self.el);
        Margins {
            top: px(style.as_ref(), "margin-top"),
            right: px(style.as_ref(), "margin-right"),
            bottom: px(style.as_ref(), "margin-bottom"),
            left: px(style.as_ref(), "margin-left"),
        }
    }

    fn position(&self) -> Point {
        let el = page_offset(&self.el);
        let origin = page_offset(&self.container);
        Point {
            x: el.x - origin.x,
            y: el.y - origin.y,
        }
    }

    fn set_offset(&mut self, offset: Point) {
        // CSS left/top place the margin box inside the container.
        let origin = page_offset(&self.container);
        let m = self.margins();
        set_px(&self.el, "left", offset.x - origin.x - m.left);
        set_px(&self.el, "top", offset.y - origin.y - m.top);
    }
}

struct DomContainer {
    el: HtmlElement,
}

impl Container for DomContainer {
    fn offset(&self) -> Point {
        page_offset(&self.el)
    }

    fn height(&self) -> f64 {
        px(computed_style(&self.el).as_ref(), "height")
    }

    fn set_height(&mut self, height: f64) {
        set_px(&self.el, "height", height);
    }
}

struct JsPlumbConnectors;

impl ConnectorRepaint for JsPlumbConnectors {
    fn repaint_all(&mut self) {
        repaint_everything();
    }
}

struct JsDrag;

impl DragService for JsDrag {
    fn make_draggable(&mut self, node: &NodeId, handle: &str) {
        make_draggable(&node.0, handle);
    }
}

/// Endpoint markup is drawn by the JS side.
struct DomEndpoint {
    node: NodeId,
    group: String,
    id: String,
    kind: String,
}

impl EndpointView for DomEndpoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn render(&mut self) {
        render_endpoint(&self.node.0, &self.group, &self.id, &self.kind);
    }

    fn destroy(&mut self) {
        destroy_endpoint(&self.node.0, &self.id);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiagramOptions {
    #[serde(flatten)]
    layout: LayoutConfig,
    schema: Option<Vec<SchemaEntry>>,
    endpoint_options: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct StateInput {
    id: NodeId,
    #[serde(default)]
    attrs: Map<String, Value>,
}

fn to_js(e: PlumbingError) -> JsValue {
    console_error(&format!("Error: {}", e));
    JsValue::from_str(&e.to_string())
}

fn parse<'a, T: Deserialize<'a>>(what: &str, json: &'a str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| {
        console_error(&format!("Error parsing {}: {}", what, e));
        JsValue::from_str(&e.to_string())
    })
}

#[wasm_bindgen]
pub struct DiagramLayout {
    controller: NodeLayoutController,
}

#[wasm_bindgen]
impl DiagramLayout {
    /// `states_json`: `[{"id": "...", "attrs": {...}}]`.
    /// `options_json`: `{"num_cols", "drag_handle", "schema", "endpoint_options"}`,
    /// every key optional.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        states_json: &str,
        options_json: &str,
    ) -> Result<DiagramLayout, JsValue> {
        let states: Vec<StateInput> = parse("states", states_json)?;
        let options: DiagramOptions = if options_json.trim().is_empty() {
            DiagramOptions::default()
        } else {
            parse("options", options_json)?
        };

        let document = document()?;
        let container: HtmlElement = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element '{}'", container_id)))?
            .dyn_into()?;

        let factory: EndpointFactory = Rc::new(|spec: &EndpointSpec<'_>| -> Box<dyn EndpointView> {
            Box::new(DomEndpoint {
                node: spec.node.clone(),
                group: spec.group.to_string(),
                id: spec.id.clone(),
                kind: spec.kind.as_ref().map(|k| k.0.clone()).unwrap_or_default(),
            })
        });
        let mut config =
            NodeViewConfig::new(factory).with_endpoint_options(options.endpoint_options);
        if let Some(schema) = options.schema {
            config = config.with_schema(EndpointSchema::Static(schema));
        }

        let mut nodes = NodeViewCollection::new();
        for state in states {
            let el: HtmlElement = match document.get_element_by_id(&state.id.0) {
                Some(el) => el.dyn_into()?,
                None => {
                    let el = document.create_element("div")?;
                    el.set_id(&state.id.0);
                    el.set_class_name("state");
                    el.dyn_into()?
                }
            };
            let element = DomElement { el, container: container.clone() };
            let model = Model::with_attrs(state.id, state.attrs);
            let view = NodeView::new(model, Box::new(element), &config).map_err(to_js)?;
            nodes.add(view);
        }

        let controller = NodeLayoutController::new(
            nodes,
            Box::new(DomContainer { el: container }),
            Box::new(JsPlumbConnectors),
            options.layout,
        );
        Ok(DiagramLayout { controller })
    }

    /// Render every state, lay them out, and make states added since the last
    /// call draggable.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.controller.nodes().render();
        self.controller.render_all().map_err(to_js)?;
        self.controller.init_dragging(&mut JsDrag);
        Ok(())
    }

    /// Call from the drag library's move callback.
    pub fn on_drag(&mut self, node_id: &str) -> Result<(), JsValue> {
        self.controller.on_drag(&NodeId::from(node_id)).map_err(to_js)
    }

    pub fn repaint(&mut self) {
        self.controller.repaint();
    }

    /// Layout of a state as `{"x", "y"}` JSON.
    pub fn layout_of(&mut self, node_id: &str) -> Result<String, JsValue> {
        let layout = self.controller.ensure_layout(&NodeId::from(node_id)).map_err(to_js)?;
        serde_json::to_string(&layout).map_err(|e| to_js(e.into()))
    }

    /// Set a model attribute. The state re-renders, and a change to an
    /// endpoint attribute adds or destroys its endpoints.
    pub fn set_attr(&mut self, node_id: &str, attr: &str, value_json: &str) -> Result<(), JsValue> {
        let value: Value = parse("attribute", value_json)?;
        let view = self
            .controller
            .nodes()
            .get(&NodeId::from(node_id))
            .ok_or_else(|| to_js(PlumbingError::UnknownNode(node_id.into())))?;
        let model = view.borrow().model().clone();
        model.set(attr, value);
        Ok(())
    }

    pub fn remove_state(&mut self, node_id: &str) -> bool {
        self.controller.remove_node(&NodeId::from(node_id)).is_some()
    }
}
