//! Expression G Sync Library
//!
//! Keeps the three isolated extension contexts consistent through message
//! passing. The background context owns the authoritative [`TabSessionStore`];
//! the page context runs the highlight engine; the popup is re-created on every
//! open and rebuilds its state from the background before accepting input.
//!
//! # Modules
//!
//! - `protocol`: wire envelope, requests and responses
//! - `store`: per-tab session store
//! - `host`: host platform seams (icon badge)
//! - `background`: background context message and event handling
//! - `page`: page context message handling around `HighlightEngine`
//! - `popup`: popup state machine and submit orchestration
//! - `transport`: the popup's async view of host messaging
//! - `bus`: in-process transport over tokio actor tasks

pub mod background;
pub mod bus;
pub mod error;
pub mod host;
pub mod page;
pub mod popup;
pub mod protocol;
pub mod store;
pub mod transport;

pub use background::{Background, HostEvent};
pub use bus::{spawn_background, spawn_page, BackgroundHandle, LocalBus, PageHandle};
pub use error::SyncError;
pub use host::{BadgeHost, MemoryBadges, BADGE_OFF, BADGE_ON};
pub use page::PageContext;
pub use popup::{plan_submit, Popup, PopupState, SubmitPlan};
pub use protocol::{envelope_for, Envelope, Request, Response, Role};
pub use store::TabSessionStore;
pub use transport::Transport;
