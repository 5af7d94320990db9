//! Popup bindings
//!
//! Runs the popup state machine from `eg-sync` in the browser. The popup script
//! hands in the two host messaging primitives as functions returning promises,
//! so every request ordering rule lives on the Rust side:
//!
//! ```js
//! const popup = new PopupHandle(tabId,
//!     (message) => chrome.runtime.sendMessage(message),
//!     (tabId, message) => chrome.tabs.sendMessage(tabId, message));
//! const view = await popup.hydrate();
//! ```
//!
//! Every action resolves to a view `{ state, input, session, plan? }`. Actions
//! issued while another is in flight wait their turn.

use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise};
use serde::Serialize;
use tokio::sync::Mutex;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use eg_core::{SearchSession, TabId};
use eg_sync::{Envelope, Popup, Response, Role, SubmitPlan, SyncError, Transport};

// =============================================================================
// Transport
// =============================================================================

struct JsTransport {
    to_background: Function,
    to_page: Function,
}

impl JsTransport {
    async fn settle(&self, role: Role, sent: Result<JsValue, JsValue>) -> Result<Response, SyncError> {
        let returned = sent.map_err(|e| host_error(role, &e))?;
        let reply = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|e| host_error(role, &e))?;

        // The host resolves with nothing when no listener answered.
        if reply.is_undefined() || reply.is_null() {
            return Err(SyncError::NoResponse(role));
        }

        let json = js_sys::JSON::stringify(&reply).map_err(|e| host_error(role, &e))?;
        Ok(serde_json::from_str(&String::from(json))?)
    }
}

#[async_trait(?Send)]
impl Transport for JsTransport {
    async fn to_background(&self, envelope: Envelope) -> Result<Response, SyncError> {
        let message = envelope_to_js(&envelope)?;
        let sent = self.to_background.call1(&JsValue::NULL, &message);
        self.settle(Role::Background, sent).await
    }

    async fn to_page(&self, tab_id: TabId, envelope: Envelope) -> Result<Response, SyncError> {
        let message = envelope_to_js(&envelope)?;
        let sent = self.to_page.call2(&JsValue::NULL, &JsValue::from(tab_id), &message);
        self.settle(Role::Page, sent).await
    }
}

fn envelope_to_js(envelope: &Envelope) -> Result<JsValue, SyncError> {
    let json = envelope.to_json()?;
    js_sys::JSON::parse(&json).map_err(|e| host_error(envelope.target, &e))
}

fn host_error(role: Role, error: &JsValue) -> SyncError {
    let message = error
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{:?}", error));
    SyncError::Host { role, message }
}

// =============================================================================
// Popup handle
// =============================================================================

#[derive(Serialize)]
struct PopupView<'a> {
    state: &'static str,
    input: &'a str,
    session: Option<&'a SearchSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'static str>,
}

fn view(popup: &Popup<JsTransport>, plan: Option<SubmitPlan>) -> Result<JsValue, JsValue> {
    let view = PopupView {
        state: popup.state().as_str(),
        input: popup.input(),
        session: popup.session(),
        plan: plan.map(SubmitPlan::as_str),
    };
    let json = serde_json::to_string(&view)
        .map_err(|e| JsValue::from_str(&format!("Failed to encode popup view: {}", e)))?;
    js_sys::JSON::parse(&json)
}

fn to_js(error: SyncError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct PopupHandle {
    popup: Rc<Mutex<Popup<JsTransport>>>,
}

#[wasm_bindgen]
impl PopupHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(tab_id: i32, to_background: Function, to_page: Function) -> PopupHandle {
        let transport = JsTransport {
            to_background,
            to_page,
        };
        PopupHandle {
            popup: Rc::new(Mutex::new(Popup::new(tab_id, transport))),
        }
    }

    /// Fetch the tab's session from the background. Input is refused until this resolves.
    pub fn hydrate(&self) -> Promise {
        let popup = self.popup.clone();
        future_to_promise(async move {
            let mut popup = popup.lock().await;
            popup.hydrate().await.map_err(to_js)?;
            view(&popup, None)
        })
    }

    /// Enter in the input box.
    pub fn submit(&self, input: String) -> Promise {
        let popup = self.popup.clone();
        future_to_promise(async move {
            let mut popup = popup.lock().await;
            let plan = popup.submit(&input).await.map_err(to_js)?;
            view(&popup, Some(plan))
        })
    }

    /// Escape in the input box.
    pub fn escape(&self) -> Promise {
        let popup = self.popup.clone();
        future_to_promise(async move {
            let mut popup = popup.lock().await;
            popup.escape().await.map_err(to_js)?;
            view(&popup, None)
        })
    }

    pub fn next(&self) -> Promise {
        let popup = self.popup.clone();
        future_to_promise(async move {
            let mut popup = popup.lock().await;
            popup.next().await.map_err(to_js)?;
            view(&popup, None)
        })
    }

    pub fn prev(&self) -> Promise {
        let popup = self.popup.clone();
        future_to_promise(async move {
            let mut popup = popup.lock().await;
            popup.prev().await.map_err(to_js)?;
            view(&popup, None)
        })
    }
}
