//! Typed view of the notification service's event envelope
//!
//! The channel itself never looks inside a message; these helpers are for
//! listeners that want the known event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::resources::ServerStatus;

/// Event type sent when a server changes status
pub const SERVER_STATUS_UPDATED: &str = "server.updated";

/// Envelope every notification is wrapped in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// Payload of a `server.updated` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusChanged {
    pub owner_id: Uuid,
    pub server_id: Uuid,
    pub status: ServerStatus,
    #[serde(rename = "ip", default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
}

impl NotificationEvent {
    /// Read the envelope out of a raw message
    pub fn from_message(message: &Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }

    /// The server status change carried by this event, if it is one
    pub fn server_status(&self) -> Option<ServerStatusChanged> {
        if self.event_type != SERVER_STATUS_UPDATED {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_updated_event() {
        let message = json!({
            "type": "server.updated",
            "payload": {
                "ownerId": "5f0c6e7a-3b8b-4a51-9d2e-5d1f2c3b4a01",
                "serverId": "0e9d8c7b-6a5f-4e3d-2c1b-0a9f8e7d6c02",
                "status": "RUNNING",
                "ip": "10.0.0.12"
            }
        });

        let event = NotificationEvent::from_message(&message).unwrap();
        let change = event.server_status().unwrap();
        assert_eq!(change.status, ServerStatus::Running);
        assert_eq!(change.ipv4_address.as_deref(), Some("10.0.0.12"));
    }

    #[test]
    fn test_other_events_are_not_status_changes() {
        let event =
            NotificationEvent::from_message(&json!({"type": "plan.created", "payload": {}}))
                .unwrap();
        assert!(event.server_status().is_none());
        assert!(NotificationEvent::from_message(&json!([1, 2, 3])).is_none());
    }
}
