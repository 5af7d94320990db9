//! Highlight Engine
//!
//! Finds pattern matches in a page's text nodes and rewrites each matching
//! node into alternating plain-text and marker fragments. Matches never span
//! text-node boundaries: markup fragments text arbitrarily, so a match split
//! across elements is not found.
//!
//! `search` does not clear previous highlights. Calling it twice without
//! `clear` in between materializes a second set of markers.

use log::debug;

use crate::pattern::Pattern;
use crate::tree::{split_fragments, MarkerStyle, PageTree};

/// Search, clear and focus navigation for one page.
#[derive(Debug, Clone, Default)]
pub struct HighlightEngine {
    style: MarkerStyle,
    match_count: usize,
    match_index: usize,
    has_active_highlights: bool,
}

impl HighlightEngine {
    pub fn new(style: MarkerStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn match_index(&self) -> usize {
        self.match_index
    }

    pub fn has_active_highlights(&self) -> bool {
        self.has_active_highlights
    }

    /// Highlight every match of `pattern` and focus the first one.
    ///
    /// Marker indices continue from the current count. Returns the updated count.
    pub fn search<T: PageTree>(&mut self, tree: &mut T, pattern: &Pattern) -> usize {
        tree.normalize();

        let before = self.match_count;
        for node in tree.text_nodes() {
            let text = tree.node_text(&node);
            let ranges = pattern.find_ranges(&text);
            if ranges.is_empty() {
                continue;
            }

            let fragments = split_fragments(&text, &ranges, self.match_count);
            tree.splice_fragments(&node, &fragments, &self.style);
            self.match_count += ranges.len();
        }

        debug!(
            "search '{}': {} new markers, {} total",
            pattern.source(),
            self.match_count - before,
            self.match_count
        );

        if self.match_count > 0 {
            self.has_active_highlights = true;
            self.match_index = 0;
            self.focus(tree, 0);
        }

        self.match_count
    }

    /// Unwrap every marker back into plain text and reset the counters.
    ///
    /// With no markers in the page the tree is left untouched.
    pub fn clear<T: PageTree>(&mut self, tree: &mut T) {
        let markers = tree.markers(&self.style);
        if !markers.is_empty() {
            for marker in &markers {
                tree.unwrap_marker(marker);
            }
            tree.normalize();
            debug!("cleared {} markers", markers.len());
        }

        self.match_count = 0;
        self.match_index = 0;
        self.has_active_highlights = false;
    }

    /// Move focus to the next marker, wrapping to the first.
    pub fn focus_next<T: PageTree>(&mut self, tree: &mut T) {
        if self.match_count == 0 {
            return;
        }
        self.unfocus(tree, self.match_index);
        self.match_index = (self.match_index + 1) % self.match_count;
        self.focus(tree, self.match_index);
    }

    /// Move focus to the previous marker, wrapping to the last.
    pub fn focus_prev<T: PageTree>(&mut self, tree: &mut T) {
        if self.match_count == 0 {
            return;
        }
        self.unfocus(tree, self.match_index);
        self.match_index = (self.match_index + self.match_count - 1) % self.match_count;
        self.focus(tree, self.match_index);
    }

    fn focus<T: PageTree>(&self, tree: &mut T, index: usize) {
        // A marker removed by the page itself is simply not focused.
        let Some(marker) = tree.find_marker(&self.style, index) else {
            debug!("marker {} missing, nothing to focus", index);
            return;
        };
        tree.set_focused(&marker, &self.style, true);
        tree.scroll_into_view(&marker);
    }

    fn unfocus<T: PageTree>(&self, tree: &mut T, index: usize) {
        if let Some(marker) = tree.find_marker(&self.style, index) {
            tree.set_focused(&marker, &self.style, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use crate::markup;
    use crate::pattern::compile;

    fn pattern(raw: &str) -> Pattern {
        compile(raw).unwrap().unwrap()
    }

    fn focused(doc: &Document, engine: &HighlightEngine) -> Vec<NodeId> {
        doc.elements_by_class(&engine.style().focus_class)
    }

    fn focused_index(doc: &Document, engine: &HighlightEngine) -> Option<usize> {
        let style = engine.style();
        let nodes = focused(doc, engine);
        assert!(nodes.len() <= 1, "more than one focused marker");
        let node = *nodes.first()?;
        (0..engine.match_count()).find(|&i| doc.find_marker(style, i) == Some(node))
    }

    #[test]
    fn test_search_scenario() {
        let mut doc = markup::parse("<p>cat and cats and Cat</p>");
        let mut engine = HighlightEngine::default();

        assert_eq!(engine.search(&mut doc, &pattern("cat")), 3);

        let markers = doc.markers(engine.style());
        let texts: Vec<String> = markers.iter().map(|&m| doc.text_content(m)).collect();
        assert_eq!(texts, vec!["cat", "cat", "Cat"]);
        assert_eq!(focused_index(&doc, &engine), Some(0));
        assert_eq!(doc.scroll_target(), Some(markers[0]));
        assert_eq!(
            markup::serialize(&doc),
            "<p><mark id=\"__expression-g-match-0__\" class=\"__expression-g-highlight__ __expression-g-highlight-focus__\">cat</mark> and \
             <mark id=\"__expression-g-match-1__\" class=\"__expression-g-highlight__\">cat</mark>s and \
             <mark id=\"__expression-g-match-2__\" class=\"__expression-g-highlight__\">Cat</mark></p>"
        );
    }

    #[test]
    fn test_search_then_clear_restores_text() {
        let src = "<div><p>The cat sat.</p><ul><li>Cat food</li><li>dog</li></ul>tail cat</div>";
        let mut doc = markup::parse(src);
        let mut engine = HighlightEngine::default();

        engine.search(&mut doc, &pattern("c.t"));
        assert_eq!(engine.match_count(), 3);
        engine.clear(&mut doc);

        assert_eq!(markup::serialize(&doc), src);
        assert_eq!(engine.match_count(), 0);
        assert!(!engine.has_active_highlights());
    }

    #[test]
    fn test_matches_do_not_span_elements() {
        let mut doc = markup::parse("<p>ca<b>t</b> cat</p>");
        let mut engine = HighlightEngine::default();
        assert_eq!(engine.search(&mut doc, &pattern("cat")), 1);
    }

    #[test]
    fn test_adjacent_text_nodes_are_merged_first() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        for part in ["c", "a", "t"] {
            let t = doc.create_text(part);
            doc.append_child(p, t);
        }
        let root = doc.root();
        doc.append_child(root, p);

        let mut engine = HighlightEngine::default();
        assert_eq!(engine.search(&mut doc, &pattern("cat")), 1);
    }

    #[test]
    fn test_one_splice_per_matching_node() {
        let mut doc = markup::parse("<p>a cat</p><p>no match</p><p>cat cat cat</p>");
        let mut engine = HighlightEngine::default();
        let before = doc.mutation_count();
        engine.search(&mut doc, &pattern("cat"));
        assert_eq!(doc.mutation_count() - before, 2);
    }

    #[test]
    fn test_script_text_is_not_searched() {
        let mut doc = markup::parse("<script>var cat;</script><p>cat</p>");
        let mut engine = HighlightEngine::default();
        assert_eq!(engine.search(&mut doc, &pattern("cat")), 1);
    }

    #[test]
    fn test_clear_without_markers_is_noop() {
        let src = "<p>nothing here</p>";
        let mut doc = markup::parse(src);
        let before = doc.mutation_count();
        let mut engine = HighlightEngine::default();
        engine.clear(&mut doc);
        assert_eq!(doc.mutation_count(), before);
        assert_eq!(markup::serialize(&doc), src);
    }

    #[test]
    fn test_no_matches_focuses_nothing() {
        let mut doc = markup::parse("<p>dog</p>");
        let mut engine = HighlightEngine::default();
        assert_eq!(engine.search(&mut doc, &pattern("cat")), 0);
        engine.focus_next(&mut doc);
        engine.focus_prev(&mut doc);
        assert_eq!(engine.match_index(), 0);
        assert!(focused(&doc, &engine).is_empty());
        assert_eq!(doc.scroll_target(), None);
    }

    #[test]
    fn test_focus_cycles() {
        let mut doc = markup::parse("<p>a1 a2</p><p>a3</p><p>a4</p>");
        let mut engine = HighlightEngine::default();
        let count = engine.search(&mut doc, &pattern("a\\d"));
        assert_eq!(count, 4);

        for step in 1..=count {
            engine.focus_next(&mut doc);
            assert_eq!(focused_index(&doc, &engine), Some(step % count));
        }
        assert_eq!(engine.match_index(), 0);
    }

    #[test]
    fn test_focus_prev_wraps_to_last() {
        let mut doc = markup::parse("<p>x x x</p>");
        let mut engine = HighlightEngine::default();
        engine.search(&mut doc, &pattern("x"));
        engine.focus_prev(&mut doc);
        assert_eq!(engine.match_index(), 2);
        assert_eq!(focused_index(&doc, &engine), Some(2));
    }

    #[test]
    fn test_next_then_prev_returns() {
        let mut doc = markup::parse("<p>x x x x x</p>");
        let mut engine = HighlightEngine::default();
        engine.search(&mut doc, &pattern("x"));
        for start in 0..5 {
            while engine.match_index() != start {
                engine.focus_next(&mut doc);
            }
            engine.focus_next(&mut doc);
            engine.focus_prev(&mut doc);
            assert_eq!(engine.match_index(), start);
            engine.focus_prev(&mut doc);
            engine.focus_next(&mut doc);
            assert_eq!(engine.match_index(), start);
            assert_eq!(focused_index(&doc, &engine), Some(start));
        }
    }

    #[test]
    fn test_missing_marker_is_not_an_error() {
        let mut doc = markup::parse("<p>x</p><p>x</p>");
        let mut engine = HighlightEngine::default();
        engine.search(&mut doc, &pattern("x"));

        // The page drops the paragraph holding marker 1.
        let second = doc.find_marker(engine.style(), 1).unwrap();
        let paragraph = doc.parent(second).unwrap();
        doc.remove(paragraph);

        engine.focus_next(&mut doc);
        assert_eq!(engine.match_index(), 1);
        assert!(focused(&doc, &engine).is_empty());

        engine.focus_next(&mut doc);
        assert_eq!(focused_index(&doc, &engine), Some(0));
    }

    #[test]
    fn test_search_twice_duplicates_markers() {
        let mut doc = markup::parse("<p>cat</p>");
        let mut engine = HighlightEngine::default();
        engine.search(&mut doc, &pattern("cat"));
        // Marker text is itself a text node, so a second pass wraps it again.
        assert_eq!(engine.search(&mut doc, &pattern("cat")), 2);
    }
}
