//! In-process Bus
//!
//! Runs the background and each page as its own tokio task with an unbounded
//! inbox, so every context handles one input at a time in arrival order. A
//! receiver that stays silent (e.g. on a target mismatch) drops the reply
//! channel, which the sender sees as `SyncError::NoResponse`.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use eg_core::{PageTree, TabId};

use crate::background::{Background, HostEvent};
use crate::error::SyncError;
use crate::host::BadgeHost;
use crate::page::PageContext;
use crate::protocol::{Envelope, Response, Role};
use crate::transport::Transport;

type Reply = oneshot::Sender<Response>;

enum BackgroundInput {
    Message(Envelope, Reply),
    Event(HostEvent),
}

// =============================================================================
// Background
// =============================================================================

#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::UnboundedSender<BackgroundInput>,
}

impl BackgroundHandle {
    pub async fn request(&self, envelope: Envelope) -> Result<Response, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BackgroundInput::Message(envelope, reply))
            .map_err(|_| SyncError::Disconnected(Role::Background))?;
        rx.await.map_err(|_| SyncError::NoResponse(Role::Background))
    }

    /// Queue a host notification behind any messages already sent.
    pub fn notify(&self, event: HostEvent) -> Result<(), SyncError> {
        self.tx
            .send(BackgroundInput::Event(event))
            .map_err(|_| SyncError::Disconnected(Role::Background))
    }
}

/// Spawn the background context. The task ends, returning the context, once every handle is dropped.
pub fn spawn_background<B>(mut background: Background<B>) -> (BackgroundHandle, JoinHandle<Background<B>>)
where
    B: BadgeHost + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        while let Some(input) = rx.recv().await {
            match input {
                BackgroundInput::Message(envelope, reply) => {
                    if let Some(response) = background.handle_message(&envelope) {
                        let _ = reply.send(response);
                    }
                }
                BackgroundInput::Event(event) => background.handle_event(event),
            }
        }
        debug!("[bus] background stopped");
        background
    });
    (BackgroundHandle { tx }, task)
}

// =============================================================================
// Page
// =============================================================================

#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::UnboundedSender<(Envelope, Reply)>,
}

impl PageHandle {
    pub async fn request(&self, envelope: Envelope) -> Result<Response, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send((envelope, reply))
            .map_err(|_| SyncError::Disconnected(Role::Page))?;
        rx.await.map_err(|_| SyncError::NoResponse(Role::Page))
    }
}

/// Spawn a page context. The task ends, returning the context, once every handle is dropped.
pub fn spawn_page<T>(mut page: PageContext<T>) -> (PageHandle, JoinHandle<PageContext<T>>)
where
    T: PageTree + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<(Envelope, Reply)>();
    let task = tokio::spawn(async move {
        while let Some((envelope, reply)) = rx.recv().await {
            if let Some(response) = page.handle_message(&envelope) {
                let _ = reply.send(response);
            }
        }
        debug!("[bus] page {} stopped", page.tab_id());
        page
    });
    (PageHandle { tx }, task)
}

// =============================================================================
// Bus
// =============================================================================

/// Routes popup messages to the spawned contexts.
#[derive(Clone)]
pub struct LocalBus {
    background: BackgroundHandle,
    pages: HashMap<TabId, PageHandle>,
}

impl LocalBus {
    pub fn new(background: BackgroundHandle) -> Self {
        Self {
            background,
            pages: HashMap::new(),
        }
    }

    /// Route `tab_id` to `page`, replacing any previous page (as a reload does).
    pub fn with_page(mut self, tab_id: TabId, page: PageHandle) -> Self {
        self.pages.insert(tab_id, page);
        self
    }
}

#[async_trait(?Send)]
impl Transport for LocalBus {
    async fn to_background(&self, envelope: Envelope) -> Result<Response, SyncError> {
        self.background.request(envelope).await
    }

    async fn to_page(&self, tab_id: TabId, envelope: Envelope) -> Result<Response, SyncError> {
        let page = self.pages.get(&tab_id).ok_or(SyncError::NoSuchPage(tab_id))?;
        page.request(envelope).await
    }
}
