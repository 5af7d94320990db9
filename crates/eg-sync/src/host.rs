//! Host platform seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use eg_core::TabId;

/// Badge text shown while a tab has an active search.
pub const BADGE_ON: &str = "on";
/// Badge text that clears the badge.
pub const BADGE_OFF: &str = "";

/// The extension icon badge, per tab.
pub trait BadgeHost {
    fn set_badge_text(&mut self, tab_id: TabId, text: &str);
}

/// Badge host that records the current text per tab.
#[derive(Debug, Default, Clone)]
pub struct MemoryBadges {
    texts: HashMap<TabId, String>,
    updates: usize,
}

impl MemoryBadges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current badge text for a tab, empty if never set.
    pub fn text(&self, tab_id: TabId) -> &str {
        self.texts.get(&tab_id).map_or(BADGE_OFF, String::as_str)
    }

    /// Number of badge writes so far.
    pub fn update_count(&self) -> usize {
        self.updates
    }
}

impl BadgeHost for MemoryBadges {
    fn set_badge_text(&mut self, tab_id: TabId, text: &str) {
        self.updates += 1;
        self.texts.insert(tab_id, text.to_string());
    }
}

/// Lets a badge host be observed from outside the context that owns it.
impl<B: BadgeHost> BadgeHost for Arc<Mutex<B>> {
    fn set_badge_text(&mut self, tab_id: TabId, text: &str) {
        match self.lock() {
            Ok(mut host) => host.set_badge_text(tab_id, text),
            Err(_) => log::warn!("badge host lock poisoned, dropping update for tab {}", tab_id),
        }
    }
}
