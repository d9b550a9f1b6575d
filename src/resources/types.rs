//! Hosting API payloads (HAL+JSON)

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HAL link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

pub type Links = HashMap<String, Link>;

/// Server plan (hardware profile)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub cpu_cores: u32,
    pub ram_mb: u32,
    pub disk_gb: u32,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Body of a plan creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub name: String,
    pub cpu_cores: u32,
    pub ram_mb: u32,
    pub disk_gb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    Pending,
    Running,
    Stopped,
    ProvisionFailed,
    #[serde(other)]
    Unknown,
}

/// Ordered server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: Uuid,
    pub name: String,
    pub plan_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    pub status: ServerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl Server {
    /// Whether the server advertises `action` as currently possible
    pub fn allows(&self, action: ServerAction) -> bool {
        self.links.contains_key(action.link_name())
    }
}

/// Lifecycle action on a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerAction {
    Start,
    Stop,
    Delete,
}

impl ServerAction {
    fn link_name(&self) -> &'static str {
        match self {
            ServerAction::Start => "start",
            ServerAction::Stop => "stop",
            ServerAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.link_name())
    }
}

impl std::str::FromStr for ServerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ServerAction::Start),
            "stop" => Ok(ServerAction::Stop),
            "delete" => Ok(ServerAction::Delete),
            other => Err(format!("unknown server action: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderServerRequest<'a> {
    pub plan_id: Uuid,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ServerActionRequest {
    pub action: ServerAction,
}

/// Page metadata of a collection response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedPlans {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedServers {
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// One page of plans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCollection {
    #[serde(rename = "_embedded", default)]
    pub embedded: EmbeddedPlans,
    #[serde(default)]
    pub page: PageMetadata,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// One page of servers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCollection {
    #[serde(rename = "_embedded", default)]
    pub embedded: EmbeddedServers,
    #[serde(default)]
    pub page: PageMetadata,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_collection_deserialization() {
        let json = r#"{
            "_embedded": {"servers": [{
                "id": "0e9d8c7b-6a5f-4e3d-2c1b-0a9f8e7d6c02",
                "name": "web-1",
                "planId": "5f0c6e7a-3b8b-4a51-9d2e-5d1f2c3b4a01",
                "ipv4Address": "10.0.0.12",
                "status": "STOPPED",
                "createdAt": "2025-03-01T12:00:00Z",
                "_links": {
                    "self": {"href": "/api/servers/0e9d8c7b-6a5f-4e3d-2c1b-0a9f8e7d6c02"},
                    "start": {"href": "/api/servers/0e9d8c7b-6a5f-4e3d-2c1b-0a9f8e7d6c02/actions"}
                }
            }]},
            "page": {"number": 1, "size": 20, "totalElements": 1, "totalPages": 1,
                     "hasNextPage": false, "hasPreviousPage": false},
            "_links": {"self": {"href": "/api/servers?page=1&pageSize=20"}}
        }"#;

        let collection: ServerCollection = serde_json::from_str(json).unwrap();
        let server = &collection.embedded.servers[0];
        assert_eq!(server.status, ServerStatus::Stopped);
        assert!(server.allows(ServerAction::Start));
        assert!(!server.allows(ServerAction::Stop));
        assert_eq!(collection.page.total_elements, 1);
    }

    #[test]
    fn test_empty_collection_without_embedded() {
        let collection: PlanCollection = serde_json::from_str(
            r#"{"page": {"number": 3, "size": 10, "totalElements": 20, "totalPages": 2}}"#,
        )
        .unwrap();
        assert!(collection.embedded.plans.is_empty());
    }

    #[test]
    fn test_unknown_status() {
        let status: ServerStatus = serde_json::from_str(r#""REBOOTING""#).unwrap();
        assert_eq!(status, ServerStatus::Unknown);
    }

    #[test]
    fn test_action_wire_format() {
        let body = ServerActionRequest {
            action: "Stop".parse().unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"action": "STOP"})
        );
        assert!("reboot".parse::<ServerAction>().is_err());
    }
}
