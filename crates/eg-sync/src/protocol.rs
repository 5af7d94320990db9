//! Message Protocol
//!
//! Every message is an envelope `{ sender, target, request, data }`. The host
//! delivers messages to every listener on a channel, so each receiver checks
//! `target` against its own role and stays silent on a mismatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use eg_core::{SearchSession, SessionPatch, TabId};

// =============================================================================
// Roles
// =============================================================================

/// The execution context a message comes from or is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Popup,
    Background,
    #[serde(alias = "content")]
    Page,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Popup => "popup",
            Self::Background => "background",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A command and its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", content = "data", rename_all = "camelCase")]
pub enum Request {
    // Background
    #[serde(rename_all = "camelCase")]
    GetSession { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    SetSession { tab_id: TabId, session: SearchSession },
    #[serde(rename_all = "camelCase")]
    UpdateSession { tab_id: TabId, session: SessionPatch },

    // Page
    ApplySession { session: SearchSession },
    Search { session: SearchSession },
    Clear {},
    FocusNext {},
    FocusPrev {},
}

impl Request {
    /// The role expected to interpret this request.
    pub fn interpreter(&self) -> Role {
        match self {
            Self::GetSession { .. } | Self::SetSession { .. } | Self::UpdateSession { .. } => {
                Role::Background
            }
            Self::ApplySession { .. }
            | Self::Search { .. }
            | Self::Clear {}
            | Self::FocusNext {}
            | Self::FocusPrev {} => Role::Page,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetSession { .. } => "getSession",
            Self::SetSession { .. } => "setSession",
            Self::UpdateSession { .. } => "updateSession",
            Self::ApplySession { .. } => "applySession",
            Self::Search { .. } => "search",
            Self::Clear {} => "clear",
            Self::FocusNext {} => "focusNext",
            Self::FocusPrev {} => "focusPrev",
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Requests without data are written with `data: {}` and accepted with
/// `data` missing or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct Envelope {
    pub sender: Role,
    pub target: Role,
    #[serde(flatten)]
    pub request: Request,
}

/// An envelope as it arrives, before its request is decoded.
#[derive(Deserialize)]
struct RawEnvelope {
    sender: Role,
    target: Role,
    request: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = serde_json::Error;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        let data = raw
            .data
            .filter(|d| !d.is_null())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        let request = serde_json::from_value(serde_json::json!({
            "request": raw.request,
            "data": data,
        }))?;
        Ok(Self {
            sender: raw.sender,
            target: raw.target,
            request,
        })
    }
}

impl Envelope {
    /// A popup-originated envelope addressed to the request's interpreter.
    pub fn from_popup(request: Request) -> Self {
        Self {
            sender: Role::Popup,
            target: request.interpreter(),
            request,
        }
    }

    pub fn is_for(&self, role: Role) -> bool {
        self.target == role
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse a raw message as seen by a listener playing `role`.
///
/// Returns `Ok(None)` for anything not addressed to `role`, including messages
/// from unrelated listeners that do not follow this envelope shape at all.
pub fn envelope_for(role: Role, json: &str) -> Result<Option<Envelope>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let target = value.get("target").and_then(|t| Role::deserialize(t).ok());
    if target != Some(role) {
        return Ok(None);
    }
    serde_json::from_value(value).map(Some)
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SearchSession>,
}

impl Response {
    pub fn ack() -> Self {
        Self::default()
    }

    pub fn with_session(session: SearchSession) -> Self {
        Self {
            error: None,
            session: Some(session),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            session: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = Envelope::from_popup(Request::GetSession { tab_id: 7 });
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "sender": "popup",
                "target": "background",
                "request": "getSession",
                "data": { "tabId": 7 }
            })
        );
    }

    #[test]
    fn test_empty_data_commands() {
        let envelope = Envelope::from_popup(Request::Clear {});
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "sender": "popup", "target": "page", "request": "clear", "data": {} })
        );
    }

    #[test]
    fn test_parse_content_alias() {
        let envelope = Envelope::from_json(
            r#"{"sender":"popup","target":"content","request":"focusNext","data":{}}"#,
        )
        .unwrap();
        assert_eq!(envelope.target, Role::Page);
        assert_eq!(envelope.request, Request::FocusNext {});
    }

    #[test]
    fn test_parse_update_session() {
        let envelope = Envelope::from_json(
            r#"{"sender":"popup","target":"background","request":"updateSession",
                "data":{"tabId":3,"session":{"isActive":true,"searchString":"a+"}}}"#,
        )
        .unwrap();
        match envelope.request {
            Request::UpdateSession { tab_id, session } => {
                assert_eq!(tab_id, 3);
                assert_eq!(session.is_active, Some(true));
                assert_eq!(session.search_string.as_deref(), Some("a+"));
                assert_eq!(session.match_count, None);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_commands_without_data() {
        let clear = envelope_for(Role::Page, r#"{"sender":"popup","target":"page","request":"clear"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(clear.request, Request::Clear {});

        let next = Envelope::from_json(r#"{"sender":"popup","target":"content","request":"focusNext","data":null}"#)
            .unwrap();
        assert_eq!(next.request, Request::FocusNext {});

        let prev = Envelope::from_json(r#"{"sender":"popup","target":"page","request":"focusPrev"}"#).unwrap();
        assert_eq!(prev.request, Request::FocusPrev {});
    }

    #[test]
    fn test_missing_data_still_required_for_payload_commands() {
        assert!(Envelope::from_json(r#"{"sender":"popup","target":"background","request":"getSession"}"#).is_err());
    }

    #[test]
    fn test_unknown_request_rejected() {
        assert!(Envelope::from_json(
            r#"{"sender":"popup","target":"page","request":"explode","data":{}}"#
        )
        .is_err());
    }

    #[test]
    fn test_envelope_for_filters_target() {
        let for_page = r#"{"sender":"popup","target":"content","request":"clear","data":{}}"#;
        assert!(envelope_for(Role::Background, for_page).unwrap().is_none());
        assert!(envelope_for(Role::Page, for_page).unwrap().is_some());

        let foreign = r#"{"type":"some-other-extension-message"}"#;
        assert!(envelope_for(Role::Page, foreign).unwrap().is_none());

        let broken = r#"{"sender":"popup","target":"page","request":"search","data":{}}"#;
        assert!(envelope_for(Role::Page, broken).is_err());
    }

    #[test]
    fn test_response_shape() {
        assert_eq!(
            serde_json::to_value(Response::ack()).unwrap(),
            json!({ "error": null })
        );
        let response: Response = serde_json::from_str(r#"{"error":"bad"}"#).unwrap();
        assert!(!response.is_ok());
    }
}
