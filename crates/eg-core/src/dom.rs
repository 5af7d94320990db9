//! In-memory Document
//!
//! An arena-backed element/text tree. Nodes are never freed; detached nodes
//! simply become unreachable from the root. Only mutations of the attached
//! tree are counted, so callers can observe how many structural swaps a pass
//! performed.

use crate::tree::{Fragment, MarkerStyle, PageTree};

/// Elements whose text is never considered visible.
pub const INVISIBLE_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// ID used to address nodes in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Attributes other than `id` and `class`, in source order
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// In-memory document rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    mutations: u64,
    scroll_target: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            mutations: 0,
            scroll_target: None,
        };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // =========================================================================
    // Construction
    // =========================================================================

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.note_mutation(parent);
    }

    /// Detach `node` from its parent. The node and its subtree stay in the arena.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent {
            self.detach(node);
            self.note_mutation(parent);
        }
    }

    /// Replace `node` with `replacements` in one splice.
    ///
    /// Does nothing if `node` has no parent.
    pub fn replace_with(&mut self, node: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };

        for &replacement in replacements {
            self.detach(replacement);
            self.nodes[replacement.0].parent = Some(parent);
        }

        let children = &mut self.nodes[parent.0].children;
        if let Some(pos) = children.iter().position(|&c| c == node) {
            children.splice(pos..=pos, replacements.iter().copied());
        }
        self.nodes[node.0].parent = None;
        self.note_mutation(parent);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    fn note_mutation(&mut self, parent: NodeId) {
        if self.is_attached(parent) {
            self.mutations += 1;
        }
    }

    // =========================================================================
    // Element data
    // =========================================================================

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) {
        if let Some(element) = self.element_mut(node) {
            element.id = Some(id.to_string());
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        match name {
            "id" => self.set_id(node, value),
            "class" => {
                for class in value.split_ascii_whitespace() {
                    self.add_class(node, class);
                }
            }
            _ => {
                if let Some(element) = self.element_mut(node) {
                    element.attributes.push((name.to_string(), value.to_string()));
                }
            }
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element_mut(node) {
            if !element.classes.iter().any(|c| c == class) {
                element.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element_mut(node) {
            element.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Text of a text node, `None` for elements.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// Concatenated text of `node` and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let NodeKind::Text(text) = &self.nodes[id.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// `node` and its descendants in document (pre-)order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// First attached element with the given id, in document order.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.element(n).and_then(|e| e.id.as_deref()) == Some(id))
    }

    /// Attached elements carrying `class`, in document order.
    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// Number of structural mutations applied to the attached tree.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// The node most recently scrolled into view.
    pub fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    /// Merge adjacent text children and drop empty text nodes throughout the subtree.
    pub fn normalize_node(&mut self, node: NodeId) {
        for id in self.descendants(node) {
            if self.element(id).is_some() && self.normalize_children(id) {
                self.note_mutation(id);
            }
        }
    }

    fn normalize_children(&mut self, parent: NodeId) -> bool {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        let mut changed = false;

        for child in children {
            let text = match &self.nodes[child.0].kind {
                NodeKind::Text(text) => text.clone(),
                NodeKind::Element(_) => {
                    kept.push(child);
                    continue;
                }
            };

            if text.is_empty() {
                self.nodes[child.0].parent = None;
                changed = true;
                continue;
            }

            let previous = kept.last().copied();
            if let Some(prev) = previous {
                if let NodeKind::Text(prev_text) = &mut self.nodes[prev.0].kind {
                    prev_text.push_str(&text);
                    self.nodes[child.0].parent = None;
                    changed = true;
                    continue;
                }
            }
            kept.push(child);
        }

        self.nodes[parent.0].children = kept;
        changed
    }

    fn is_invisible(&self, node: NodeId) -> bool {
        self.tag(node).is_some_and(|tag| INVISIBLE_TAGS.contains(&tag))
    }
}

impl PageTree for Document {
    type Node = NodeId;

    fn normalize(&mut self) {
        self.normalize_node(self.root);
    }

    fn text_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id.0].kind {
                NodeKind::Text(_) => out.push(id),
                NodeKind::Element(_) if self.is_invisible(id) => {}
                NodeKind::Element(_) => {
                    stack.extend(self.nodes[id.0].children.iter().rev().copied());
                }
            }
        }
        out
    }

    fn node_text(&self, node: &NodeId) -> String {
        self.text(*node).unwrap_or_default().to_string()
    }

    fn splice_fragments(&mut self, node: &NodeId, fragments: &[Fragment<'_>], style: &MarkerStyle) {
        let mut replacement = Vec::with_capacity(fragments.len());

        // Built off-tree, so none of this counts as a live mutation.
        for fragment in fragments {
            match *fragment {
                Fragment::Text(text) => replacement.push(self.create_text(text)),
                Fragment::Marker { text, index } => {
                    let marker = self.create_element(&style.tag);
                    self.set_id(marker, &style.marker_id(index));
                    self.add_class(marker, &style.highlight_class);
                    let inner = self.create_text(text);
                    self.append_child(marker, inner);
                    replacement.push(marker);
                }
            }
        }

        self.replace_with(*node, &replacement);
    }

    fn markers(&self, style: &MarkerStyle) -> Vec<NodeId> {
        self.elements_by_class(&style.highlight_class)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(style.tag.as_str()))
            .collect()
    }

    fn unwrap_marker(&mut self, marker: &NodeId) {
        let text = self.text_content(*marker);
        let replacement = self.create_text(&text);
        self.replace_with(*marker, &[replacement]);
    }

    fn find_marker(&self, style: &MarkerStyle, index: usize) -> Option<NodeId> {
        self.get_element_by_id(&style.marker_id(index))
            .filter(|&n| self.tag(n) == Some(style.tag.as_str()))
    }

    fn set_focused(&mut self, marker: &NodeId, style: &MarkerStyle, focused: bool) {
        if focused {
            self.add_class(*marker, &style.focus_class);
        } else {
            self.remove_class(*marker, &style.focus_class);
        }
    }

    fn scroll_into_view(&mut self, marker: &NodeId) {
        self.scroll_target = Some(*marker);
    }
}
