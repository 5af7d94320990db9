//! Live DOM page tree
//!
//! [`PageTree`] over the browser document body. Host calls that fail are
//! reported to the console and otherwise ignored, so a hostile or half-loaded
//! page degrades to fewer highlights rather than a broken session.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

use eg_core::dom::INVISIBLE_TAGS;
use eg_core::{Fragment, MarkerStyle, PageTree};

/// NodeFilter.SHOW_TEXT
const SHOW_TEXT: u32 = 0x4;

pub struct LiveDom {
    document: Document,
    root: Node,
    invisible_selector: String,
}

impl LiveDom {
    /// Tree rooted at the current window's `<body>`.
    pub fn from_window() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document available"))?;
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("Document has no body"))?;
        Ok(Self::new(document, body.into()))
    }

    pub fn new(document: Document, root: Node) -> Self {
        Self {
            document,
            root,
            invisible_selector: INVISIBLE_TAGS.join(","),
        }
    }

    fn is_visible(&self, text: &Node) -> bool {
        match text.parent_element() {
            Some(parent) => !matches!(parent.closest(&self.invisible_selector), Ok(Some(_))),
            None => false,
        }
    }

    fn collect_text_nodes(&self) -> Result<Vec<Node>, JsValue> {
        let walker = self
            .document
            .create_tree_walker_with_what_to_show(&self.root, SHOW_TEXT)?;
        let mut out = Vec::new();
        while let Some(node) = walker.next_node()? {
            if self.is_visible(&node) {
                out.push(node);
            }
        }
        Ok(out)
    }

    fn build_fragment(&self, fragments: &[Fragment<'_>], style: &MarkerStyle) -> Result<Node, JsValue> {
        let fragment = self.document.create_document_fragment();
        for piece in fragments {
            match *piece {
                Fragment::Text(text) => {
                    fragment.append_child(&self.document.create_text_node(text))?;
                }
                Fragment::Marker { text, index } => {
                    let marker = self.document.create_element(&style.tag)?;
                    marker.set_id(&style.marker_id(index));
                    marker.class_list().add_1(&style.highlight_class)?;
                    marker.set_text_content(Some(text));
                    fragment.append_child(&marker)?;
                }
            }
        }
        Ok(fragment.into())
    }

    fn replace(&self, old: &Node, new: &Node) -> Result<(), JsValue> {
        let parent = old
            .parent_node()
            .ok_or_else(|| JsValue::from_str("Node is detached"))?;
        parent.replace_child(new, old)?;
        Ok(())
    }
}

fn report(what: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        web_sys::console::warn_2(&JsValue::from_str(&format!("[eg] {} failed:", what)), &e);
    }
}

impl PageTree for LiveDom {
    type Node = Node;

    fn normalize(&mut self) {
        self.root.normalize();
    }

    fn text_nodes(&self) -> Vec<Node> {
        self.collect_text_nodes().unwrap_or_else(|e| {
            report("text walk", Err(e));
            Vec::new()
        })
    }

    fn node_text(&self, node: &Node) -> String {
        node.node_value().unwrap_or_default()
    }

    fn splice_fragments(&mut self, node: &Node, fragments: &[Fragment<'_>], style: &MarkerStyle) {
        let result = self
            .build_fragment(fragments, style)
            .and_then(|fragment| self.replace(node, &fragment));
        report("splice", result);
    }

    fn markers(&self, style: &MarkerStyle) -> Vec<Node> {
        match self.document.query_selector_all(&style.marker_selector()) {
            Ok(list) => (0..list.length()).filter_map(|i| list.get(i)).collect(),
            Err(e) => {
                report("marker query", Err(e));
                Vec::new()
            }
        }
    }

    fn unwrap_marker(&mut self, marker: &Node) {
        let text = marker.text_content().unwrap_or_default();
        let replacement: Node = self.document.create_text_node(&text).into();
        report("unwrap", self.replace(marker, &replacement));
    }

    fn find_marker(&self, style: &MarkerStyle, index: usize) -> Option<Node> {
        self.document
            .get_element_by_id(&style.marker_id(index))
            .filter(|e| e.tag_name().eq_ignore_ascii_case(&style.tag))
            .map(Node::from)
    }

    fn set_focused(&mut self, marker: &Node, style: &MarkerStyle, focused: bool) {
        let Some(element) = marker.dyn_ref::<Element>() else {
            return;
        };
        let classes = element.class_list();
        let result = if focused {
            classes.add_1(&style.focus_class)
        } else {
            classes.remove_1(&style.focus_class)
        };
        report("focus class", result);
    }

    fn scroll_into_view(&mut self, marker: &Node) {
        if let Some(element) = marker.dyn_ref::<Element>() {
            element.scroll_into_view_with_bool(true);
        }
    }
}
