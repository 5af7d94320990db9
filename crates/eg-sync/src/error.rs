//! Error type for cross-context operations.

use eg_core::{PatternError, TabId};

use crate::protocol::Role;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0} context is not reachable")]
    Disconnected(Role),
    #[error("Sending to {role} failed: {message}")]
    Host { role: Role, message: String },
    #[error("No response from {0}")]
    NoResponse(Role),
    #[error("{role} rejected request: {message}")]
    Rejected { role: Role, message: String },
    #[error("No page context for tab {0}")]
    NoSuchPage(TabId),
    #[error("Popup has not been hydrated yet")]
    NotHydrated,
}
