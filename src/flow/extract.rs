//! Reading tokens and error messages out of a flow's UI description

use super::types::{FlowUi, UiNode};

/// Attribute name of the anti-forgery token node
pub const CSRF_TOKEN_NODE: &str = "csrf_token";

/// Shown when a rejected submission carries no message at all
pub const FALLBACK_ERROR: &str = "Unknown error occurred";

/// Anti-forgery token of a flow.
///
/// Value of the first node named `csrf_token`, or an empty string when the
/// flow has none (some flow configurations omit it).
pub fn csrf_token(nodes: &[UiNode]) -> &str {
    nodes
        .iter()
        .find(|n| n.attributes.name.as_deref() == Some(CSRF_TOKEN_NODE))
        .and_then(|n| n.attributes.value.as_ref())
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// The single message a user sees for a rejected submission.
///
/// Flow-level messages win over field messages; within each, the first one
/// wins.
pub fn error_message(ui: Option<&FlowUi>) -> String {
    let Some(ui) = ui else {
        return FALLBACK_ERROR.to_string();
    };

    if let Some(message) = ui.messages.first() {
        return message.text.clone();
    }

    ui.nodes
        .iter()
        .find_map(|n| n.messages.first())
        .map(|m| m.text.clone())
        .unwrap_or_else(|| FALLBACK_ERROR.to_string())
}
