//! Shared HTTP context
//!
//! One `reqwest::Client` and one cookie jar per `HostingClient`. The identity
//! service sets its session cookie in the jar; every later request and the
//! notification handshake read it back from there.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub(crate) const JSON: &str = "application/json";
pub(crate) const HAL_JSON: &str = "application/hal+json";

/// Error body returned by the hosting API
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client, cookie jar and config shared by the client components
#[derive(Clone)]
pub struct HttpContext {
    config: Arc<ClientConfig>,
    client: Client,
    jar: Arc<Jar>,
}

impl HttpContext {
    /// Create a new HTTP context with an empty cookie jar
    pub fn new(config: ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(JSON));

        let client = Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            client,
            jar,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The cookie jar holding the identity session
    pub fn cookies(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        debug!(url = %url, "GET");
        self.client.get(url)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        debug!(url = %url, "POST");
        self.client.post(url).header(header::CONTENT_TYPE, JSON)
    }
}

/// Turn a non-success response into a `Request` error.
///
/// The message comes from a JSON `{ "message": ... }` body when there is one,
/// otherwise `fallback` is used.
pub(crate) async fn request_error(response: Response, fallback: &str) -> ClientError {
    let status = response.status().as_u16();
    let body = response.bytes().await.unwrap_or_default();

    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    ClientError::Request { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = HttpContext::new(ClientConfig::new("https://hosting.test.local").unwrap())
            .unwrap();
        assert_eq!(ctx.config().origin.as_str(), "https://hosting.test.local/");
    }

    #[test]
    fn test_error_body_without_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"code": 409}"#).unwrap();
        assert!(body.message.is_none());
    }
}
