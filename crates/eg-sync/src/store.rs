//! Tab Session Store
//!
//! The authoritative map from tab to search session. It lives in the
//! background context for that context's whole lifetime and is reachable from
//! other contexts only through messages. Nothing is persisted.

use std::collections::HashMap;

use eg_core::{SearchSession, SessionPatch, TabId};

#[derive(Debug, Default, Clone)]
pub struct TabSessionStore {
    sessions: HashMap<TabId, SearchSession>,
}

impl TabSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored session, or the empty session if the tab has none.
    pub fn get(&self, tab_id: TabId) -> SearchSession {
        self.sessions
            .get(&tab_id)
            .cloned()
            .unwrap_or_else(|| SearchSession::empty(tab_id))
    }

    /// Replace the tab's session.
    pub fn set(&mut self, tab_id: TabId, session: SearchSession) -> SearchSession {
        self.sessions.insert(tab_id, session.clone());
        session
    }

    /// Merge `patch` onto the existing (or empty) session and store the result.
    pub fn update(&mut self, tab_id: TabId, patch: &SessionPatch) -> SearchSession {
        let session = self
            .sessions
            .entry(tab_id)
            .or_insert_with(|| SearchSession::empty(tab_id));
        session.apply(patch);
        session.clone()
    }

    pub fn clear(&mut self, tab_id: TabId) {
        self.sessions.remove(&tab_id);
    }

    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.sessions.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
