//! HTTP client for the hosting resource API
//!
//! Every call is one request with the session cookies attached. A non-success
//! status becomes `ClientError::Request`, carrying the server's `message` when
//! the body has one and the operation's fallback text otherwise.

use reqwest::{header, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::types::*;
use crate::error::Result;
use crate::http::{request_error, HttpContext, HAL_JSON};

pub const DEFAULT_PLAN_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SERVER_PAGE_SIZE: u32 = 20;

/// Resource operations, keyed to their fallback error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    ListPlans,
    GetPlan,
    CreatePlan,
    ListServers,
    GetServer,
    OrderServer,
    ServerAction,
}

impl ResourceOp {
    /// Message used when the server gives no usable error message
    pub fn fallback_message(&self) -> &'static str {
        match self {
            ResourceOp::ListPlans => "Failed to fetch plans",
            ResourceOp::GetPlan => "Failed to fetch plan",
            ResourceOp::CreatePlan => "Failed to create plan",
            ResourceOp::ListServers => "Failed to fetch servers",
            ResourceOp::GetServer => "Failed to fetch server",
            ResourceOp::OrderServer => "Failed to order server",
            ResourceOp::ServerAction => "Failed to perform action",
        }
    }
}

/// Client for plans and servers
#[derive(Clone)]
pub struct ResourceClient {
    http: HttpContext,
}

impl ResourceClient {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    // ==================== Plans ====================

    /// List plans, one page at a time
    pub async fn list_plans(&self, page: u32, page_size: u32) -> Result<PlanCollection> {
        let url = self.http.config().api_url("/plans")?;
        let request = self
            .http
            .get(url)
            .query(&[("page", page), ("pageSize", page_size)])
            .header(header::ACCEPT, HAL_JSON);

        self.execute(ResourceOp::ListPlans, request).await
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Plan> {
        let url = self.http.config().api_url(&format!("/plans/{}", plan_id))?;
        let request = self.http.get(url).header(header::ACCEPT, HAL_JSON);

        self.execute(ResourceOp::GetPlan, request).await
    }

    pub async fn create_plan(&self, plan: &NewPlan) -> Result<Plan> {
        let url = self.http.config().api_url("/plans")?;
        let request = self.http.post(url).json(plan);

        self.execute(ResourceOp::CreatePlan, request).await
    }

    // ==================== Servers ====================

    /// List the caller's servers, one page at a time
    pub async fn list_servers(&self, page: u32, page_size: u32) -> Result<ServerCollection> {
        let url = self.http.config().api_url("/servers")?;
        let request = self
            .http
            .get(url)
            .query(&[("page", page), ("pageSize", page_size)])
            .header(header::ACCEPT, HAL_JSON);

        self.execute(ResourceOp::ListServers, request).await
    }

    pub async fn get_server(&self, server_id: Uuid) -> Result<Server> {
        let url = self
            .http
            .config()
            .api_url(&format!("/servers/{}", server_id))?;
        let request = self.http.get(url).header(header::ACCEPT, HAL_JSON);

        self.execute(ResourceOp::GetServer, request).await
    }

    /// Order a new server on `plan_id`
    pub async fn order_server(&self, plan_id: Uuid, name: &str) -> Result<Server> {
        let url = self.http.config().api_url("/servers")?;
        let request = self
            .http
            .post(url)
            .header(header::ACCEPT, HAL_JSON)
            .json(&OrderServerRequest { plan_id, name });

        self.execute(ResourceOp::OrderServer, request).await
    }

    /// Start, stop or delete a server.
    ///
    /// The action is accepted asynchronously; the final status arrives as a
    /// `server.updated` notification.
    pub async fn perform_server_action(
        &self,
        server_id: Uuid,
        action: ServerAction,
    ) -> Result<Server> {
        let url = self
            .http
            .config()
            .api_url(&format!("/servers/{}/actions", server_id))?;
        let request = self.http.post(url).json(&ServerActionRequest { action });

        self.execute(ResourceOp::ServerAction, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        op: ResourceOp,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            debug!(operation = ?op, status = %response.status(), "Resource request failed");
            return Err(request_error(response, op.fallback_message()).await);
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_table() {
        assert_eq!(ResourceOp::ListPlans.fallback_message(), "Failed to fetch plans");
        assert_eq!(ResourceOp::ListServers.fallback_message(), "Failed to fetch servers");
        assert_eq!(
            ResourceOp::ServerAction.fallback_message(),
            "Failed to perform action"
        );
    }
}
