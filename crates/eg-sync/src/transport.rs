//! Transport
//!
//! The popup's view of the host messaging primitive: one request/response
//! channel to the background and one per tab to that tab's page.
//!
//! Futures are not required to be `Send`: the browser transport awaits JS
//! promises, and the popup only ever drives one action at a time on the
//! thread that owns it.

use async_trait::async_trait;

use eg_core::{SearchSession, TabId};

use crate::error::SyncError;
use crate::protocol::{Envelope, Response, Role};

#[async_trait(?Send)]
pub trait Transport {
    async fn to_background(&self, envelope: Envelope) -> Result<Response, SyncError>;

    async fn to_page(&self, tab_id: TabId, envelope: Envelope) -> Result<Response, SyncError>;
}

/// Turn an error response into `SyncError::Rejected`.
pub fn accepted(role: Role, response: Response) -> Result<Response, SyncError> {
    match response.error {
        Some(message) => Err(SyncError::Rejected { role, message }),
        None => Ok(response),
    }
}

/// The session carried by a successful response, if any.
pub fn session_from(role: Role, response: Response) -> Result<Option<SearchSession>, SyncError> {
    accepted(role, response).map(|r| r.session)
}
