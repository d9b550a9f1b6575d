//! Identity flow payloads

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The self-service flows the identity service offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Login,
    Registration,
    Logout,
}

impl FlowKind {
    /// Path segment of the flow under `/self-service`
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Login => "login",
            FlowKind::Registration => "registration",
            FlowKind::Logout => "logout",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-issued handle for one in-progress identity operation.
///
/// Created by initializing a flow and consumed by exactly one submission.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowDescriptor {
    pub id: String,
    #[serde(default)]
    pub ui: FlowUi,
}

/// UI description attached to a flow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowUi {
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub messages: Vec<UiText>,
}

/// One form field description
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub attributes: NodeAttributes,
    #[serde(default)]
    pub messages: Vec<UiText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeAttributes {
    /// Input name; text and image nodes have none
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Human-readable message
#[derive(Debug, Clone, Deserialize)]
pub struct UiText {
    #[serde(default)]
    pub id: Option<i64>,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Body of a rejected flow submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowFailure {
    #[serde(default)]
    pub ui: Option<FlowUi>,
}

/// Session returned by the identity service.
///
/// Only a few fields are typed; the rest is kept as the server sent it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Email trait of the session identity, if present
    pub fn email(&self) -> Option<&str> {
        self.identity
            .as_ref()?
            .get("traits")?
            .get("email")?
            .as_str()
    }
}

/// Success body of a login submission
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub session: Option<Session>,
}

/// Success body of a registration submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Logout flow handed out by the identity service
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutFlow {
    pub logout_url: String,
    #[serde(default)]
    pub logout_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginSubmission<'a> {
    pub method: &'static str,
    pub identifier: &'a str,
    pub password: &'a str,
    pub csrf_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationSubmission<'a> {
    pub method: &'static str,
    pub password: &'a str,
    pub traits: RegistrationTraits<'a>,
    pub csrf_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationTraits<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_descriptor_deserialization() {
        let json = r#"{
            "id": "f6b0c3c1-1b5e-4d0b-9d55-1f3c1f6f3c01",
            "type": "browser",
            "ui": {
                "action": "/auth/self-service/login?flow=f6b0",
                "method": "POST",
                "nodes": [
                    {"type": "input", "group": "default",
                     "attributes": {"name": "csrf_token", "type": "hidden", "value": "tok"},
                     "messages": []},
                    {"type": "text", "group": "default",
                     "attributes": {"id": "lookup_secret", "text": {"text": "x"}}}
                ]
            }
        }"#;

        let flow: FlowDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(flow.id, "f6b0c3c1-1b5e-4d0b-9d55-1f3c1f6f3c01");
        assert_eq!(flow.ui.nodes.len(), 2);
        assert!(flow.ui.messages.is_empty());
        assert!(flow.ui.nodes[1].attributes.name.is_none());
    }

    #[test]
    fn test_session_keeps_unknown_fields() {
        let json = r#"{
            "id": "sess-1",
            "active": true,
            "expires_at": "2026-01-01T00:00:00Z",
            "identity": {"id": "ident-1", "traits": {"email": "ada@example.com", "name": "Ada"}}
        }"#;

        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.id.as_deref(), Some("sess-1"));
        assert_eq!(session.email(), Some("ada@example.com"));
        assert!(session.extra.contains_key("expires_at"));
    }

    #[test]
    fn test_registration_submission_shape() {
        let body = RegistrationSubmission {
            method: "password",
            password: "hunter22",
            traits: RegistrationTraits {
                email: "ada@example.com",
                name: "Ada",
            },
            csrf_token: "tok",
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "method": "password",
                "password": "hunter22",
                "traits": {"email": "ada@example.com", "name": "Ada"},
                "csrf_token": "tok"
            })
        );
    }
}
