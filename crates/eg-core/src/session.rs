//! Search session records.
//!
//! A [`SearchSession`] is the plain-data copy of a tab's search state that is
//! exchanged between contexts. The compiled pattern never travels with it:
//! every context that needs one rebuilds it through [`WorkingSession`].

use serde::{Deserialize, Serialize};

use crate::pattern::{compile, Pattern, PatternError};

/// Opaque host tab identifier.
pub type TabId = i32;

/// Per-tab search state as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSession {
    pub tab_id: TabId,
    /// True while a non-empty search is applied to the tab's page
    pub is_active: bool,
    /// Raw user input, may be empty
    pub search_string: String,
    /// Markers materialized in the page; advisory outside the page context
    pub match_count: usize,
    /// Focused marker, meaningful only while `match_count > 0`
    pub match_index: usize,
}

impl SearchSession {
    /// The inactive, empty session every tab starts with.
    pub fn empty(tab_id: TabId) -> Self {
        Self {
            tab_id,
            ..Self::default()
        }
    }

    /// A fresh session for newly submitted input: counts reset, active iff non-empty.
    pub fn for_input(tab_id: TabId, input: &str) -> Self {
        Self {
            tab_id,
            is_active: !input.trim().is_empty(),
            search_string: input.to_string(),
            match_count: 0,
            match_index: 0,
        }
    }

    /// True if this session is indistinguishable from [`SearchSession::empty`].
    pub fn is_empty(&self) -> bool {
        *self == Self::empty(self.tab_id)
    }

    /// Shallow-merge `patch` onto this session.
    pub fn apply(&mut self, patch: &SessionPatch) {
        if let Some(tab_id) = patch.tab_id {
            self.tab_id = tab_id;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(search_string) = &patch.search_string {
            self.search_string.clone_from(search_string);
        }
        if let Some(match_count) = patch.match_count {
            self.match_count = match_count;
        }
        if let Some(match_index) = patch.match_index {
            self.match_index = match_index;
        }
    }
}

/// A partial [`SearchSession`]; absent fields leave the target untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_index: Option<usize>,
}

impl SessionPatch {
    /// Combine two patches, fields in `other` winning.
    pub fn merged(mut self, other: &SessionPatch) -> Self {
        if other.tab_id.is_some() {
            self.tab_id = other.tab_id;
        }
        if other.is_active.is_some() {
            self.is_active = other.is_active;
        }
        if other.search_string.is_some() {
            self.search_string.clone_from(&other.search_string);
        }
        if other.match_count.is_some() {
            self.match_count = other.match_count;
        }
        if other.match_index.is_some() {
            self.match_index = other.match_index;
        }
        self
    }

    /// Only the match counters, as reported back by the page.
    pub fn counts(session: &SearchSession) -> Self {
        Self {
            match_count: Some(session.match_count),
            match_index: Some(session.match_index),
            ..Self::default()
        }
    }
}

impl From<SearchSession> for SessionPatch {
    fn from(session: SearchSession) -> Self {
        Self {
            tab_id: Some(session.tab_id),
            is_active: Some(session.is_active),
            search_string: Some(session.search_string),
            match_count: Some(session.match_count),
            match_index: Some(session.match_index),
        }
    }
}

/// A session together with the pattern derived from its search string.
///
/// The pattern is `None` exactly when the search string is empty or blank.
#[derive(Debug, Clone, Default)]
pub struct WorkingSession {
    session: SearchSession,
    pattern: Option<Pattern>,
}

impl WorkingSession {
    /// Rebuild the compiled pattern from `session.search_string`.
    pub fn hydrate(session: SearchSession) -> Result<Self, PatternError> {
        let pattern = compile(&session.search_string)?;
        Ok(Self { session, pattern })
    }

    pub fn empty(tab_id: TabId) -> Self {
        Self {
            session: SearchSession::empty(tab_id),
            pattern: None,
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    /// Record the page's current counters.
    pub fn set_counts(&mut self, match_count: usize, match_index: usize) {
        self.session.match_count = match_count;
        self.session.match_index = match_index;
    }

    pub fn into_session(self) -> SearchSession {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let session = SearchSession {
            tab_id: 4,
            is_active: true,
            search_string: "cat".to_string(),
            match_count: 3,
            match_index: 1,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tabId": 4,
                "isActive": true,
                "searchString": "cat",
                "matchCount": 3,
                "matchIndex": 1
            })
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let session: SearchSession = serde_json::from_str(r#"{"searchString":"x"}"#).unwrap();
        assert_eq!(session.search_string, "x");
        assert!(!session.is_active);
        assert_eq!(session.match_count, 0);
    }

    #[test]
    fn test_for_input() {
        assert!(SearchSession::for_input(1, "cat").is_active);
        assert!(!SearchSession::for_input(1, "").is_active);
        assert!(SearchSession::for_input(1, "").is_empty());
    }

    #[test]
    fn test_apply_patch() {
        let mut session = SearchSession::empty(2);
        session.apply(&SessionPatch {
            search_string: Some("dog".to_string()),
            is_active: Some(true),
            ..SessionPatch::default()
        });
        assert_eq!(session.tab_id, 2);
        assert_eq!(session.search_string, "dog");
        assert!(session.is_active);
        assert_eq!(session.match_count, 0);
    }

    #[test]
    fn test_working_session_pattern_iff_string() {
        let empty = WorkingSession::hydrate(SearchSession::empty(1)).unwrap();
        assert!(empty.pattern().is_none());

        let active = WorkingSession::hydrate(SearchSession::for_input(1, "c.t")).unwrap();
        assert_eq!(active.pattern().map(|p| p.source()), Some("c.t"));

        assert!(WorkingSession::hydrate(SearchSession::for_input(1, "[")).is_err());
    }
}
