//! Popup Context
//!
//! The popup is destroyed on close and rebuilt on every open, so it keeps no
//! state of its own beyond what it fetches from the background. It is modelled
//! as a small state machine whose transitions happen only after a completed
//! round trip:
//!
//! ```text
//! Uninitialized --hydrate--> Hydrated <--submit/escape--> SearchActive
//! ```
//!
//! Each user action runs a short synchronous decision followed by a strictly
//! ordered chain of requests: the background write is acknowledged before the
//! page is cleared, and the clear is acknowledged before the next search.

use log::{debug, info};

use eg_core::{compile, SearchSession, SessionPatch, TabId};

use crate::error::SyncError;
use crate::protocol::{Envelope, Request, Role};
use crate::transport::{accepted, session_from, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupState {
    /// Not yet hydrated from the background; input is refused.
    Uninitialized,
    /// Hydrated, no search applied to the page.
    Hydrated(SearchSession),
    /// A non-empty search is applied to the page.
    SearchActive(SearchSession),
}

impl PopupState {
    fn from_session(session: SearchSession) -> Self {
        if session.is_active {
            Self::SearchActive(session)
        } else {
            Self::Hydrated(session)
        }
    }

    pub fn session(&self) -> Option<&SearchSession> {
        match self {
            Self::Uninitialized => None,
            Self::Hydrated(session) | Self::SearchActive(session) => Some(session),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::SearchActive(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Hydrated(_) => "hydrated",
            Self::SearchActive(_) => "searchActive",
        }
    }
}

/// What pressing Enter does, decided before any message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPlan {
    /// Input unchanged: step to the next match
    FocusNext,
    /// Input emptied: remove highlights
    Clear,
    /// First search on this page
    Search,
    /// A different search was active: clear it, then search
    ClearThenSearch,
}

impl SubmitPlan {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FocusNext => "focusNext",
            Self::Clear => "clear",
            Self::Search => "search",
            Self::ClearThenSearch => "clearThenSearch",
        }
    }
}

/// Decide how to handle `input` given the popup's working session.
pub fn plan_submit(working: &SearchSession, input: &str) -> SubmitPlan {
    let first_run = working.search_string.trim().is_empty();
    if !first_run && working.search_string == input {
        return SubmitPlan::FocusNext;
    }

    if input.is_empty() {
        SubmitPlan::Clear
    } else if working.is_active {
        SubmitPlan::ClearThenSearch
    } else {
        SubmitPlan::Search
    }
}

pub struct Popup<T: Transport> {
    tab_id: TabId,
    transport: T,
    state: PopupState,
    input: String,
}

impl<T: Transport> Popup<T> {
    pub fn new(tab_id: TabId, transport: T) -> Self {
        Self {
            tab_id,
            transport,
            state: PopupState::Uninitialized,
            input: String::new(),
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn state(&self) -> &PopupState {
        &self.state
    }

    /// Contents of the input box.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn session(&self) -> Option<&SearchSession> {
        self.state.session()
    }

    /// Fetch this tab's session from the background and pre-fill the input.
    ///
    /// A tab the background has never seen hydrates to the empty session.
    pub async fn hydrate(&mut self) -> Result<&SearchSession, SyncError> {
        let response = self
            .transport
            .to_background(Envelope::from_popup(Request::GetSession { tab_id: self.tab_id }))
            .await?;
        let session = session_from(Role::Background, response)?
            .unwrap_or_else(|| SearchSession::empty(self.tab_id));

        info!(
            "[popup] hydrated tab {} (active: {}, '{}')",
            self.tab_id, session.is_active, session.search_string
        );
        self.input.clone_from(&session.search_string);
        self.state = PopupState::from_session(session);
        self.session().ok_or(SyncError::NotHydrated)
    }

    /// Handle Enter in the input box.
    ///
    /// An input that does not compile is refused before anything is sent.
    pub async fn submit(&mut self, input: &str) -> Result<SubmitPlan, SyncError> {
        let working = self.session().ok_or(SyncError::NotHydrated)?.clone();
        let input = input.trim();
        self.input = input.to_string();

        let plan = plan_submit(&working, input);
        debug!("[popup] submit '{}': {:?}", input, plan);

        if plan == SubmitPlan::FocusNext {
            self.focus(Request::FocusNext {}).await?;
            return Ok(plan);
        }

        compile(input)?;

        let session = SearchSession::for_input(self.tab_id, input);
        let stored = self.update_background(SessionPatch::from(session.clone())).await?;
        self.state = PopupState::from_session(stored);

        match plan {
            SubmitPlan::Clear => self.clear_page().await?,
            SubmitPlan::ClearThenSearch => {
                self.clear_page().await?;
                self.search_page(session).await?;
            }
            SubmitPlan::Search => self.search_page(session).await?,
            SubmitPlan::FocusNext => {}
        }

        Ok(plan)
    }

    /// Handle Escape: drop the search everywhere and blank the input.
    pub async fn escape(&mut self) -> Result<(), SyncError> {
        if self.state == PopupState::Uninitialized {
            return Err(SyncError::NotHydrated);
        }

        let empty = SearchSession::empty(self.tab_id);
        let response = self
            .transport
            .to_background(Envelope::from_popup(Request::SetSession {
                tab_id: self.tab_id,
                session: empty.clone(),
            }))
            .await?;
        accepted(Role::Background, response)?;

        self.clear_page().await?;
        self.input.clear();
        self.state = PopupState::Hydrated(empty);
        Ok(())
    }

    /// The "next" button.
    pub async fn next(&mut self) -> Result<(), SyncError> {
        self.focus(Request::FocusNext {}).await
    }

    /// The "previous" button.
    pub async fn prev(&mut self) -> Result<(), SyncError> {
        self.focus(Request::FocusPrev {}).await
    }

    async fn focus(&mut self, request: Request) -> Result<(), SyncError> {
        let PopupState::SearchActive(working) = &self.state else {
            return Ok(());
        };
        let working = working.clone();

        let response = self
            .transport
            .to_page(self.tab_id, Envelope::from_popup(request))
            .await?;
        let page = session_from(Role::Page, response)?
            .unwrap_or_else(|| SearchSession::empty(self.tab_id));

        if page.search_string != working.search_string {
            // The page lost its highlights (reloaded); search again.
            info!("[popup] page of tab {} was reset, searching again", self.tab_id);
            return self.search_page(working).await;
        }

        self.record_counts(&page).await
    }

    async fn search_page(&mut self, session: SearchSession) -> Result<(), SyncError> {
        let response = self
            .transport
            .to_page(self.tab_id, Envelope::from_popup(Request::Search { session: session.clone() }))
            .await?;
        let page = session_from(Role::Page, response)?.unwrap_or(session);
        self.record_counts(&page).await
    }

    async fn clear_page(&mut self) -> Result<(), SyncError> {
        let response = self
            .transport
            .to_page(self.tab_id, Envelope::from_popup(Request::Clear {}))
            .await?;
        accepted(Role::Page, response)?;
        Ok(())
    }

    /// Adopt the page's counters and forward them to the background.
    async fn record_counts(&mut self, page: &SearchSession) -> Result<(), SyncError> {
        if let PopupState::Hydrated(session) | PopupState::SearchActive(session) = &mut self.state {
            session.match_count = page.match_count;
            session.match_index = page.match_index;
        }
        self.update_background(SessionPatch::counts(page)).await?;
        Ok(())
    }

    async fn update_background(&self, patch: SessionPatch) -> Result<SearchSession, SyncError> {
        let response = self
            .transport
            .to_background(Envelope::from_popup(Request::UpdateSession {
                tab_id: self.tab_id,
                session: patch,
            }))
            .await?;
        Ok(session_from(Role::Background, response)?.unwrap_or_else(|| SearchSession::empty(self.tab_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{Background, HostEvent};
    use crate::bus::{spawn_background, spawn_page, LocalBus};
    use crate::host::{MemoryBadges, BADGE_OFF, BADGE_ON};
    use crate::page::PageContext;
    use crate::protocol::Response;
    use async_trait::async_trait;
    use eg_core::{markup, PageTree};
    use std::sync::{Arc, Mutex};

    const TAB: TabId = 1;

    type Badges = Arc<Mutex<MemoryBadges>>;

    fn badge(badges: &Badges) -> String {
        badges.lock().unwrap().text(TAB).to_string()
    }

    fn bus_with_page(src: &str) -> (LocalBus, Badges) {
        let badges: Badges = Arc::new(Mutex::new(MemoryBadges::new()));
        let (background, _) = spawn_background(Background::new(badges.clone()));
        let (page, _) = spawn_page(PageContext::new(TAB, markup::parse(src)));
        (LocalBus::new(background).with_page(TAB, page), badges)
    }

    /// Records every envelope and answers from a fixed script.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(Role, String)>>,
    }

    #[async_trait(?Send)]
    impl Transport for Recorder {
        async fn to_background(&self, envelope: Envelope) -> Result<Response, SyncError> {
            self.sent.lock().unwrap().push((Role::Background, envelope.request.name().to_string()));
            Ok(match envelope.request {
                Request::UpdateSession { tab_id, session } => {
                    let mut stored = SearchSession::empty(tab_id);
                    stored.apply(&session);
                    Response::with_session(stored)
                }
                _ => Response::with_session(SearchSession::empty(TAB)),
            })
        }

        async fn to_page(&self, _tab_id: TabId, envelope: Envelope) -> Result<Response, SyncError> {
            self.sent.lock().unwrap().push((Role::Page, envelope.request.name().to_string()));
            Ok(match envelope.request {
                Request::Search { session } => Response::with_session(session),
                _ => Response::with_session(SearchSession::empty(TAB)),
            })
        }
    }

    impl Recorder {
        fn names(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, name)| name.clone()).collect()
        }
    }

    #[test]
    fn test_plan_submit() {
        let empty = SearchSession::empty(TAB);
        let active = SearchSession::for_input(TAB, "cat");

        assert_eq!(plan_submit(&empty, "cat"), SubmitPlan::Search);
        assert_eq!(plan_submit(&empty, ""), SubmitPlan::Clear);
        assert_eq!(plan_submit(&active, "cat"), SubmitPlan::FocusNext);
        assert_eq!(plan_submit(&active, "dog"), SubmitPlan::ClearThenSearch);
        assert_eq!(plan_submit(&active, ""), SubmitPlan::Clear);
    }

    #[tokio::test]
    async fn test_submit_before_hydrate_refused() {
        let mut popup = Popup::new(TAB, Recorder::default());
        assert!(matches!(popup.submit("cat").await, Err(SyncError::NotHydrated)));
        assert!(popup.transport.names().is_empty());
    }

    #[tokio::test]
    async fn test_message_ordering() {
        let mut popup = Popup::new(TAB, Recorder::default());
        popup.hydrate().await.unwrap();
        popup.submit("cat").await.unwrap();
        popup.submit("dog").await.unwrap();

        assert_eq!(
            popup.transport.names(),
            vec![
                "getSession",
                // first run
                "updateSession",
                "search",
                "updateSession",
                // changed input
                "updateSession",
                "clear",
                "search",
                "updateSession",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_never_searches() {
        let mut popup = Popup::new(TAB, Recorder::default());
        popup.hydrate().await.unwrap();
        assert_eq!(popup.submit("   ").await.unwrap(), SubmitPlan::Clear);
        assert!(!popup.transport.names().contains(&"search".to_string()));
        assert!(popup.transport.names().contains(&"clear".to_string()));
        assert!(!popup.state().is_active());
    }

    #[tokio::test]
    async fn test_invalid_pattern_refused() {
        let mut popup = Popup::new(TAB, Recorder::default());
        popup.hydrate().await.unwrap();
        assert!(matches!(popup.submit("(cat").await, Err(SyncError::Pattern(_))));
        assert_eq!(popup.transport.names(), vec!["getSession"]);
        assert!(!popup.state().is_active());
    }

    #[tokio::test]
    async fn test_full_session() {
        let (bus, badges) = bus_with_page("<p>cat and cats and Cat</p>");
        let mut popup = Popup::new(TAB, bus.clone());

        let hydrated = popup.hydrate().await.unwrap();
        assert_eq!(hydrated, &SearchSession::empty(TAB));

        assert_eq!(popup.submit("cat").await.unwrap(), SubmitPlan::Search);
        assert_eq!(badge(&badges), BADGE_ON);
        let session = popup.session().unwrap();
        assert_eq!(session.match_count, 3);
        assert_eq!(session.match_index, 0);

        assert_eq!(popup.submit("cat").await.unwrap(), SubmitPlan::FocusNext);
        assert_eq!(popup.session().unwrap().match_index, 1);
        popup.prev().await.unwrap();
        popup.prev().await.unwrap();
        assert_eq!(popup.session().unwrap().match_index, 2);

        assert_eq!(popup.submit("").await.unwrap(), SubmitPlan::Clear);
        assert_eq!(badge(&badges), BADGE_OFF);
        assert!(!popup.state().is_active());
    }

    #[tokio::test]
    async fn test_reopened_popup_rehydrates() {
        let (bus, _) = bus_with_page("<p>a b a</p>");
        let mut popup = Popup::new(TAB, bus.clone());
        popup.hydrate().await.unwrap();
        popup.submit("a").await.unwrap();
        drop(popup);

        let mut reopened = Popup::new(TAB, bus.clone());
        let session = reopened.hydrate().await.unwrap().clone();
        assert!(session.is_active);
        assert_eq!(session.search_string, "a");
        assert_eq!(session.match_count, 2);
        assert_eq!(reopened.input(), "a");
        assert!(reopened.state().is_active());

        // Same input steps focus instead of searching again.
        assert_eq!(reopened.submit("a").await.unwrap(), SubmitPlan::FocusNext);
        assert_eq!(reopened.session().unwrap().match_index, 1);
    }

    #[tokio::test]
    async fn test_changed_input_replaces_highlights() {
        let badges: Badges = Arc::new(Mutex::new(MemoryBadges::new()));
        let (background, _) = spawn_background(Background::new(badges.clone()));
        let (page, page_task) = spawn_page(PageContext::new(TAB, markup::parse("<p>cat dog dog</p>")));
        let bus = LocalBus::new(background).with_page(TAB, page);

        let mut popup = Popup::new(TAB, bus);
        popup.hydrate().await.unwrap();
        popup.submit("cat").await.unwrap();
        assert_eq!(popup.submit("dog").await.unwrap(), SubmitPlan::ClearThenSearch);
        assert_eq!(popup.session().unwrap().match_count, 2);

        drop(popup);
        let page = page_task.await.unwrap();
        let style = page.engine().style().clone();
        let texts: Vec<String> = page
            .tree()
            .markers(&style)
            .iter()
            .map(|&m| page.tree().text_content(m))
            .collect();
        assert_eq!(texts, vec!["dog", "dog"]);
    }

    #[tokio::test]
    async fn test_escape_clears_everything() {
        let src = "<p>cat</p>";
        let badges: Badges = Arc::new(Mutex::new(MemoryBadges::new()));
        let (background, _) = spawn_background(Background::new(badges.clone()));
        let (page, page_task) = spawn_page(PageContext::new(TAB, markup::parse(src)));
        let bus = LocalBus::new(background).with_page(TAB, page);

        let mut popup = Popup::new(TAB, bus);
        popup.hydrate().await.unwrap();
        popup.submit("cat").await.unwrap();
        popup.escape().await.unwrap();

        assert_eq!(popup.input(), "");
        assert_eq!(popup.state(), &PopupState::Hydrated(SearchSession::empty(TAB)));
        assert_eq!(badge(&badges), BADGE_OFF);

        drop(popup);
        let page = page_task.await.unwrap();
        assert_eq!(markup::serialize(page.tree()), src);
    }

    #[tokio::test]
    async fn test_reloaded_page_is_searched_again() {
        let badges: Badges = Arc::new(Mutex::new(MemoryBadges::new()));
        let (background, _) = spawn_background(Background::new(badges));
        let (page, _) = spawn_page(PageContext::new(TAB, markup::parse("<p>x x</p>")));
        let bus = LocalBus::new(background.clone()).with_page(TAB, page);

        let mut popup = Popup::new(TAB, bus);
        popup.hydrate().await.unwrap();
        popup.submit("x").await.unwrap();
        drop(popup);

        // The tab reloads: a fresh page context, the store still says active.
        let (reloaded, _) = spawn_page(PageContext::new(TAB, markup::parse("<p>x x x</p>")));
        let bus = LocalBus::new(background.clone()).with_page(TAB, reloaded);
        background.notify(HostEvent::TabActivated(TAB)).unwrap();

        let mut popup = Popup::new(TAB, bus);
        popup.hydrate().await.unwrap();
        popup.next().await.unwrap();
        let session = popup.session().unwrap();
        assert_eq!(session.match_count, 3);
        assert_eq!(session.match_index, 0);
    }

    #[tokio::test]
    async fn test_buttons_inactive_are_noops() {
        let mut popup = Popup::new(TAB, Recorder::default());
        popup.hydrate().await.unwrap();
        popup.next().await.unwrap();
        popup.prev().await.unwrap();
        assert_eq!(popup.transport.names(), vec!["getSession"]);
    }
}
