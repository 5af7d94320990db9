//! WebAssembly bindings for Expression G
//!
//! Each extension context loads this module once. The page script calls
//! `init_page` and forwards every runtime message to `page_handle_message`;
//! the background script does the same with `init_background` and
//! `background_handle_message`. The popup script builds a [`PopupHandle`].
//! Messages and responses cross the boundary as plain JS objects.

mod live;
mod popup;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use eg_core::{compile, SearchSession, TabId};
use eg_sync::{envelope_for, plan_submit, Background, BadgeHost, HostEvent, PageContext, Response, Role};

pub use live::LiveDom;
pub use popup::PopupHandle;

/// Tab id used by a page context before any session reaches it.
const UNKNOWN_TAB: TabId = -1;

/// Badge host that forwards to a JS `(tabId, text) => void` callback.
struct JsBadges {
    callback: js_sys::Function,
}

impl BadgeHost for JsBadges {
    fn set_badge_text(&mut self, tab_id: TabId, text: &str) {
        let result = self
            .callback
            .call2(&JsValue::NULL, &JsValue::from(tab_id), &JsValue::from_str(text));
        if let Err(e) = result {
            web_sys::console::warn_2(&JsValue::from_str("[eg] badge update failed:"), &e);
        }
    }
}

thread_local! {
    static PAGE: RefCell<Option<PageContext<LiveDom>>> = RefCell::new(None);
    static BACKGROUND: RefCell<Option<Background<JsBadges>>> = RefCell::new(None);
}

// =============================================================================
// Message plumbing
// =============================================================================

fn stringify(value: &JsValue) -> Result<String, JsValue> {
    let json = js_sys::JSON::stringify(value)?;
    Ok(String::from(json))
}

fn response_to_js(response: &Response) -> Result<JsValue, JsValue> {
    let json = response
        .to_json()
        .map_err(|e| JsValue::from_str(&format!("Failed to encode response: {}", e)))?;
    js_sys::JSON::parse(&json)
}

/// Run `handle` on a message if it is addressed to `role`.
///
/// Returns `undefined` for messages meant for someone else so the caller's
/// listener stays silent.
fn dispatch(
    role: Role,
    message: &JsValue,
    handle: impl FnOnce(&eg_sync::Envelope) -> Option<Response>,
) -> Result<JsValue, JsValue> {
    let json = stringify(message)?;
    let response = match envelope_for(role, &json) {
        Ok(Some(envelope)) => handle(&envelope),
        Ok(None) => None,
        Err(e) => Some(Response::error(format!("Malformed message: {}", e))),
    };
    match response {
        Some(response) => response_to_js(&response),
        None => Ok(JsValue::UNDEFINED),
    }
}

// =============================================================================
// Page
// =============================================================================

#[wasm_bindgen]
pub fn init_page(tab_id: Option<i32>) -> Result<(), JsValue> {
    let tree = LiveDom::from_window()?;
    PAGE.with(|page| {
        *page.borrow_mut() = Some(PageContext::new(tab_id.unwrap_or(UNKNOWN_TAB), tree));
    });
    Ok(())
}

#[wasm_bindgen]
pub fn page_handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    PAGE.with(|page| {
        let mut page = page.borrow_mut();
        let page = page
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Page not initialized"))?;
        dispatch(Role::Page, &message, |envelope| page.handle_message(envelope))
    })
}

// =============================================================================
// Background
// =============================================================================

#[wasm_bindgen]
pub fn init_background(set_badge: js_sys::Function) {
    BACKGROUND.with(|bg| {
        let mut background = Background::new(JsBadges { callback: set_badge });
        background.handle_event(HostEvent::Startup);
        *bg.borrow_mut() = Some(background);
    });
}

fn with_background<R>(f: impl FnOnce(&mut Background<JsBadges>) -> R) -> Result<R, JsValue> {
    BACKGROUND.with(|bg| {
        let mut bg = bg.borrow_mut();
        let background = bg
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Background not initialized"))?;
        Ok(f(background))
    })
}

#[wasm_bindgen]
pub fn background_handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    with_background(|bg| dispatch(Role::Background, &message, |envelope| bg.handle_message(envelope)))?
}

#[wasm_bindgen]
pub fn background_installed() -> Result<(), JsValue> {
    with_background(|bg| bg.handle_event(HostEvent::Installed))
}

#[wasm_bindgen]
pub fn background_tab_activated(tab_id: i32) -> Result<(), JsValue> {
    with_background(|bg| bg.handle_event(HostEvent::TabActivated(tab_id)))
}

#[wasm_bindgen]
pub fn background_tab_removed(tab_id: i32) -> Result<(), JsValue> {
    with_background(|bg| bg.handle_event(HostEvent::TabRemoved(tab_id)))
}

// =============================================================================
// Popup helpers
// =============================================================================

/// Decide what Enter does for `input` given the popup's working session.
///
/// Returns one of `focusNext`, `clear`, `search` or `clearThenSearch`.
#[wasm_bindgen]
pub fn plan_submit_js(session: JsValue, input: &str) -> Result<String, JsValue> {
    let json = stringify(&session)?;
    let session: SearchSession = serde_json::from_str(&json)
        .map_err(|e| JsValue::from_str(&format!("Invalid session: {}", e)))?;
    Ok(plan_submit(&session, input.trim()).as_str().to_string())
}

/// Validate user input. Returns the error message, or `None` if it compiles.
#[wasm_bindgen]
pub fn check_pattern(input: &str) -> Option<String> {
    compile(input).err().map(|e| e.to_string())
}
