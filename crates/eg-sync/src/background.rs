//! Background Context
//!
//! Owns the [`TabSessionStore`] and the icon badge. Two event sources feed it,
//! popup messages and host notifications, and both are handled one at a time
//! in arrival order. The store only changes in response to them.

use log::{debug, info, trace};

use eg_core::{SearchSession, TabId};

use crate::host::{BadgeHost, BADGE_OFF, BADGE_ON};
use crate::protocol::{Envelope, Request, Response, Role};
use crate::store::TabSessionStore;

/// Notifications from the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Installed,
    Startup,
    TabActivated(TabId),
    TabRemoved(TabId),
}

pub struct Background<B: BadgeHost> {
    store: TabSessionStore,
    badges: B,
}

impl<B: BadgeHost> Background<B> {
    pub fn new(badges: B) -> Self {
        Self {
            store: TabSessionStore::new(),
            badges,
        }
    }

    pub fn store(&self) -> &TabSessionStore {
        &self.store
    }

    pub fn badges(&self) -> &B {
        &self.badges
    }

    /// Handle one message. Returns `None` for messages addressed to another role.
    pub fn handle_message(&mut self, envelope: &Envelope) -> Option<Response> {
        if !envelope.is_for(Role::Background) {
            trace!("[bg] ignoring {} for {}", envelope.request.name(), envelope.target);
            return None;
        }
        debug!("[bg] {} from {}", envelope.request.name(), envelope.sender);

        let response = match &envelope.request {
            Request::GetSession { tab_id } => Response::with_session(self.store.get(*tab_id)),
            Request::SetSession { tab_id, session } => {
                let session = self.store.set(*tab_id, session.clone());
                self.refresh_badge(*tab_id, &session);
                Response::with_session(session)
            }
            Request::UpdateSession { tab_id, session } => {
                let session = self.store.update(*tab_id, session);
                self.refresh_badge(*tab_id, &session);
                Response::with_session(session)
            }
            other => Response::error(format!("background cannot handle '{}'", other.name())),
        };

        Some(response)
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Installed => info!("[bg] installed"),
            HostEvent::Startup => info!("[bg] startup"),
            HostEvent::TabActivated(tab_id) => {
                debug!("[bg] tab {} activated", tab_id);
                let session = self.store.get(tab_id);
                self.refresh_badge(tab_id, &session);
            }
            HostEvent::TabRemoved(tab_id) => {
                debug!("[bg] tab {} removed", tab_id);
                self.store.clear(tab_id);
            }
        }
    }

    fn refresh_badge(&mut self, tab_id: TabId, session: &SearchSession) {
        let text = if session.is_active { BADGE_ON } else { BADGE_OFF };
        self.badges.set_badge_text(tab_id, text);
    }
}
