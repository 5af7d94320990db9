//! Page tree abstraction and the marker DOM contract.

// =============================================================================
// Marker Style
// =============================================================================

/// Placeholder in [`MarkerStyle::id_template`] replaced by the marker index.
pub const ID_PLACEHOLDER: &str = "%ID%";

pub const DEFAULT_MARKER_TAG: &str = "mark";
pub const DEFAULT_ID_TEMPLATE: &str = "__expression-g-match-%ID%__";
pub const DEFAULT_HIGHLIGHT_CLASS: &str = "__expression-g-highlight__";
pub const DEFAULT_FOCUS_CLASS: &str = "__expression-g-highlight-focus__";

/// How highlight markers appear in the page.
///
/// Markers are located by id during focus navigation, so the id template must
/// be unlikely to collide with ids the page already uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    /// Element tag wrapping each match
    pub tag: String,
    /// Id template, `%ID%` is replaced with the marker index
    pub id_template: String,
    /// Class carried by every marker
    pub highlight_class: String,
    /// Class carried by the single focused marker
    pub focus_class: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            tag: DEFAULT_MARKER_TAG.to_string(),
            id_template: DEFAULT_ID_TEMPLATE.to_string(),
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            focus_class: DEFAULT_FOCUS_CLASS.to_string(),
        }
    }
}

impl MarkerStyle {
    /// Element id for the marker at `index`.
    pub fn marker_id(&self, index: usize) -> String {
        self.id_template.replace(ID_PLACEHOLDER, &index.to_string())
    }

    /// CSS selector matching every marker.
    pub fn marker_selector(&self) -> String {
        format!("{}.{}", self.tag, self.highlight_class)
    }
}

// =============================================================================
// Fragments
// =============================================================================

/// One piece of a split text node, in left-to-right order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Unmatched text, kept as a plain text node
    Text(&'a str),
    /// Matched text, wrapped in a marker carrying `index`
    Marker { text: &'a str, index: usize },
}

/// Split `text` around `ranges` into alternating unmatched/matched fragments.
///
/// `ranges` must be sorted and non-overlapping. Empty unmatched runs are omitted.
pub fn split_fragments<'a>(
    text: &'a str,
    ranges: &[std::ops::Range<usize>],
    first_index: usize,
) -> Vec<Fragment<'a>> {
    let mut fragments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = 0usize;

    for (offset, range) in ranges.iter().enumerate() {
        if range.start > cursor {
            fragments.push(Fragment::Text(&text[cursor..range.start]));
        }
        fragments.push(Fragment::Marker {
            text: &text[range.clone()],
            index: first_index + offset,
        });
        cursor = range.end;
    }

    if cursor < text.len() {
        fragments.push(Fragment::Text(&text[cursor..]));
    }

    fragments
}

// =============================================================================
// Page Tree
// =============================================================================

/// The document operations the highlight engine needs.
///
/// Implementations must treat every operation as infallible from the engine's
/// point of view: a host failure degrades to a no-op rather than an error.
pub trait PageTree {
    /// Handle to a node in the tree.
    type Node: Clone;

    /// Merge adjacent text nodes and drop empty ones.
    fn normalize(&mut self);

    /// Every visible text node, in document order.
    fn text_nodes(&self) -> Vec<Self::Node>;

    /// Text content of a text node.
    fn node_text(&self, node: &Self::Node) -> String;

    /// Replace `node` with the given fragments in a single structural swap.
    fn splice_fragments(&mut self, node: &Self::Node, fragments: &[Fragment<'_>], style: &MarkerStyle);

    /// Every marker currently in the tree, in document order.
    fn markers(&self, style: &MarkerStyle) -> Vec<Self::Node>;

    /// Replace a marker with a single text node holding its text.
    fn unwrap_marker(&mut self, marker: &Self::Node);

    /// The marker carrying `index`, if it is still in the tree.
    fn find_marker(&self, style: &MarkerStyle, index: usize) -> Option<Self::Node>;

    /// Add or remove the focus class on a marker.
    fn set_focused(&mut self, marker: &Self::Node, style: &MarkerStyle, focused: bool);

    /// Bring a marker into the visible viewport.
    fn scroll_into_view(&mut self, marker: &Self::Node);
}
