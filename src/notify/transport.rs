//! WebSocket Transport Layer
//!
//! Single responsibility: open a connection to the notification endpoint and
//! hand back raw inbound frames. No knowledge of listeners or reconnection.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use reqwest::cookie::{CookieStore, Jar};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, protocol::Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;
use url::Url;

use crate::error::ChannelError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Opens connections for the notification channel
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url`; returns only once the connection is open.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, ChannelError>;
}

/// An open connection
#[async_trait]
pub trait Connection: Send {
    /// Receive the next application frame.
    ///
    /// Returns `None` once the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError>;

    /// Close the connection from our side.
    async fn close(&mut self);
}

/// tokio-tungstenite connector.
///
/// Attaches the session cookies of the page origin to the handshake.
pub struct WsConnector {
    origin: Url,
    cookies: Option<Arc<Jar>>,
}

impl WsConnector {
    pub fn new(origin: Url, cookies: Option<Arc<Jar>>) -> Self {
        Self { origin, cookies }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, ChannelError> {
        debug!(url = %url, "Connecting to WebSocket");

        let mut request = url
            .into_client_request()
            .map_err(|e| ChannelError::Connect(format!("Failed to build request: {}", e)))?;

        let origin = self.origin.origin().ascii_serialization();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            request.headers_mut().insert("Origin", value);
        }

        // Cookies belong to the http origin; HttpOnly ones never match a ws:// URL
        if let Some(cookies) = self
            .cookies
            .as_ref()
            .and_then(|jar| jar.cookies(&self.origin))
        {
            let value = HeaderValue::from_bytes(cookies.as_bytes())
                .map_err(|e| ChannelError::Connect(format!("Invalid cookie header: {}", e)))?;
            request.headers_mut().insert("Cookie", value);
        }

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        let (sink, stream) = ws.split();

        debug!(url = %url, "WebSocket connected");
        Ok(Box::new(WsConnection { sink, stream }))
    }
}

struct WsConnection {
    sink: WsSink,
    stream: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "Server closed connection");
                    return Ok(None);
                }
                // Pong is handled automatically by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Close handshake failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        let connector = WsConnector::new(Url::parse("http://127.0.0.1:1").unwrap(), None);
        let result = connector.connect("ws://127.0.0.1:1/api/notification/ws").await;
        assert!(matches!(result, Err(ChannelError::Connect(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let connector = WsConnector::new(Url::parse("http://localhost").unwrap(), None);
        let result = connector.connect("not a url").await;
        assert!(matches!(result, Err(ChannelError::Connect(_))));
    }
}
