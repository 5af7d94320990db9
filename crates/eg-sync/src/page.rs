//! Page Context
//!
//! Holds the page's working copy of the tab session and drives the
//! [`HighlightEngine`] over the page tree. The working copy is rebuilt from
//! every session the popup sends, recompiling the pattern locally.

use log::debug;

use eg_core::{HighlightEngine, MarkerStyle, PageTree, PatternError, SearchSession, TabId, WorkingSession};

use crate::protocol::{Envelope, Request, Response, Role};

pub struct PageContext<T: PageTree> {
    tab_id: TabId,
    tree: T,
    engine: HighlightEngine,
    working: WorkingSession,
}

impl<T: PageTree> PageContext<T> {
    pub fn new(tab_id: TabId, tree: T) -> Self {
        Self::with_style(tab_id, tree, MarkerStyle::default())
    }

    pub fn with_style(tab_id: TabId, tree: T, style: MarkerStyle) -> Self {
        Self {
            tab_id,
            tree,
            engine: HighlightEngine::new(style),
            working: WorkingSession::empty(tab_id),
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn engine(&self) -> &HighlightEngine {
        &self.engine
    }

    pub fn session(&self) -> &SearchSession {
        self.working.session()
    }

    /// Handle one message. Returns `None` for messages addressed to another role.
    pub fn handle_message(&mut self, envelope: &Envelope) -> Option<Response> {
        if !envelope.is_for(Role::Page) {
            return None;
        }
        debug!("[page {}] {}", self.tab_id, envelope.request.name());

        let result = match &envelope.request {
            Request::ApplySession { session } => self.apply(session.clone()).map(|_| Response::ack()),
            Request::Search { session } => self.search(session.clone()).map(Response::with_session),
            Request::Clear {} => {
                self.clear();
                Ok(Response::with_session(self.session().clone()))
            }
            Request::FocusNext {} => {
                self.engine.focus_next(&mut self.tree);
                self.sync_counts();
                Ok(Response::with_session(self.session().clone()))
            }
            Request::FocusPrev {} => {
                self.engine.focus_prev(&mut self.tree);
                self.sync_counts();
                Ok(Response::with_session(self.session().clone()))
            }
            other => return Some(Response::error(format!("page cannot handle '{}'", other.name()))),
        };

        Some(result.unwrap_or_else(|e| Response::error(e.to_string())))
    }

    /// Replace the working copy, recompiling its pattern.
    pub fn apply(&mut self, session: SearchSession) -> Result<(), PatternError> {
        self.working = WorkingSession::hydrate(session)?;
        self.sync_counts();
        Ok(())
    }

    /// Apply `session` and highlight its pattern. Does not clear existing markers.
    pub fn search(&mut self, session: SearchSession) -> Result<SearchSession, PatternError> {
        self.working = WorkingSession::hydrate(session)?;
        if let Some(pattern) = self.working.pattern() {
            self.engine.search(&mut self.tree, pattern);
        }
        self.sync_counts();
        Ok(self.session().clone())
    }

    /// Remove all markers and reset the working copy.
    pub fn clear(&mut self) {
        self.engine.clear(&mut self.tree);
        self.working = WorkingSession::empty(self.tab_id);
    }

    fn sync_counts(&mut self) {
        self.working
            .set_counts(self.engine.match_count(), self.engine.match_index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eg_core::{markup, Document};

    fn page(src: &str) -> PageContext<Document> {
        PageContext::new(1, markup::parse(src))
    }

    fn send(page: &mut PageContext<Document>, request: Request) -> Response {
        page.handle_message(&Envelope::from_popup(request)).expect("page response")
    }

    #[test]
    fn test_search_reports_counts() {
        let mut page = page("<p>cat and cats and Cat</p>");
        let response = send(&mut page, Request::Search { session: SearchSession::for_input(1, "cat") });
        let session = response.session.unwrap();
        assert_eq!(session.match_count, 3);
        assert_eq!(session.match_index, 0);
        assert_eq!(session.search_string, "cat");
    }

    #[test]
    fn test_focus_round_trip() {
        let mut page = page("<p>a a a</p>");
        send(&mut page, Request::Search { session: SearchSession::for_input(1, "a") });
        let next = send(&mut page, Request::FocusNext {}).session.unwrap();
        assert_eq!(next.match_index, 1);
        let prev = send(&mut page, Request::FocusPrev {}).session.unwrap();
        assert_eq!(prev.match_index, 0);
        let wrapped = send(&mut page, Request::FocusPrev {}).session.unwrap();
        assert_eq!(wrapped.match_index, 2);
        assert_eq!(wrapped.match_count, 3);
    }

    #[test]
    fn test_clear_resets_working_copy() {
        let src = "<p>a cat</p>";
        let mut page = page(src);
        send(&mut page, Request::Search { session: SearchSession::for_input(1, "cat") });
        let session = send(&mut page, Request::Clear {}).session.unwrap();
        assert_eq!(session, SearchSession::empty(1));
        assert_eq!(markup::serialize(page.tree()), src);
    }

    #[test]
    fn test_apply_session_recompiles() {
        let mut page = page("<p>x</p>");
        let response = send(&mut page, Request::ApplySession { session: SearchSession::for_input(1, "x+") });
        assert!(response.is_ok());
        assert_eq!(page.session().search_string, "x+");
        assert_eq!(page.engine().match_count(), 0);
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let src = "<p>x</p>";
        let mut page = page(src);
        let response = send(&mut page, Request::Search { session: SearchSession::for_input(1, "(x") });
        assert!(!response.is_ok());
        assert_eq!(markup::serialize(page.tree()), src);
    }

    #[test]
    fn test_empty_search_is_noop() {
        let mut page = page("<p>x</p>");
        let session = send(&mut page, Request::Search { session: SearchSession::empty(1) }).session.unwrap();
        assert_eq!(session.match_count, 0);
    }

    #[test]
    fn test_mismatched_target_is_silent() {
        let src = "<p>cat</p>";
        let mut page = page(src);
        let envelope = Envelope {
            sender: Role::Popup,
            target: Role::Background,
            request: Request::Search { session: SearchSession::for_input(1, "cat") },
        };
        assert_eq!(page.handle_message(&envelope), None);
        assert_eq!(markup::serialize(page.tree()), src);
        assert_eq!(page.session(), &SearchSession::empty(1));
    }
}
