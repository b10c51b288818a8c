//! DomTree: `ContentTree` over the live document

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Node};

use crate::annotator::error::AnnotateError;
use crate::annotator::renderer::{Fragment, SWATCH_CLASSES, SWATCH_TAG};
use crate::annotator::tree::ContentTree;

/// Attribute holding the fingerprint stamp on content nodes
pub const MARKER_ATTRIBUTE: &str = "data-swatch-fingerprint";

#[derive(Debug, Clone)]
pub struct DomTree {
    document: Document,
}

impl DomTree {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Tree over `window.document`
    pub fn from_window() -> Result<Self, AnnotateError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| AnnotateError::rejected("no document available"))?;
        Ok(Self::new(document))
    }

    fn is_text(node: &Node) -> bool {
        node.node_type() == Node::TEXT_NODE
    }

    fn attached_parent(node: &Node) -> Result<Node, AnnotateError> {
        if !node.is_connected() {
            return Err(AnnotateError::rejected("node is detached"));
        }
        node.parent_node()
            .ok_or_else(|| AnnotateError::rejected("node has no parent"))
    }

    fn swatch_element(&self, raw: &str, style: &str) -> Result<Node, AnnotateError> {
        let span = self.document.create_element(SWATCH_TAG).map_err(js_rejected)?;
        span.set_attribute("class", SWATCH_CLASSES).map_err(js_rejected)?;
        span.set_attribute("style", style).map_err(js_rejected)?;
        let text = self.document.create_text_node(raw);
        span.append_child(&text).map_err(js_rejected)?;
        Ok(span.into())
    }
}

fn js_rejected(err: wasm_bindgen::JsValue) -> AnnotateError {
    AnnotateError::rejected(format!("{:?}", err))
}

impl ContentTree for DomTree {
    type Node = Node;

    fn document(&self) -> Node {
        self.document.clone().into()
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn text(&self, node: &Node) -> Option<String> {
        if Self::is_text(node) {
            Some(node.node_value().unwrap_or_default())
        } else {
            None
        }
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>().map(|e| e.tag_name().to_ascii_lowercase())
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .map(|e| e.class_list().contains(class))
            .unwrap_or(false)
    }

    fn is_connected(&self, node: &Node) -> bool {
        node.is_connected()
    }

    fn marker(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(MARKER_ATTRIBUTE)
    }

    fn set_marker(&mut self, node: &Node, value: &str) -> Result<(), AnnotateError> {
        let element = node
            .dyn_ref::<Element>()
            .ok_or_else(|| AnnotateError::rejected("only elements carry a marker"))?;
        element.set_attribute(MARKER_ATTRIBUTE, value).map_err(js_rejected)
    }

    fn unwrap_swatch(&mut self, swatch: &Node) -> Result<(), AnnotateError> {
        let parent = Self::attached_parent(swatch)?;

        let before = swatch.previous_sibling().filter(Self::is_text);
        let after = swatch.next_sibling().filter(Self::is_text);

        let mut joined = String::new();
        for node in [before.as_ref(), Some(swatch), after.as_ref()].into_iter().flatten() {
            joined.push_str(&self.text_content(node));
        }

        let replacement = self.document.create_text_node(&joined);
        parent.insert_before(&replacement, Some(swatch)).map_err(js_rejected)?;
        for node in [before.as_ref(), Some(swatch), after.as_ref()].into_iter().flatten() {
            parent.remove_child(node).map_err(js_rejected)?;
        }
        Ok(())
    }

    fn splice(&mut self, text_node: &Node, fragments: &[Fragment]) -> Result<(), AnnotateError> {
        if !Self::is_text(text_node) {
            return Err(AnnotateError::rejected("splice target is not a text node"));
        }
        let parent = Self::attached_parent(text_node)?;

        for fragment in fragments {
            let node: Node = match fragment {
                Fragment::Text(text) => self.document.create_text_node(text).into(),
                Fragment::Swatch(annotation) => self.swatch_element(&annotation.raw, &annotation.style())?,
            };
            parent.insert_before(&node, Some(text_node)).map_err(js_rejected)?;
        }
        parent.remove_child(text_node).map_err(js_rejected)?;
        Ok(())
    }
}
