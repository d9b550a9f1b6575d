//! Error types for the hosting client

use thiserror::Error;

use crate::flow::FlowKind;

/// Client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// The identity service did not hand out a flow
    #[error("Failed to initialize {0} flow")]
    FlowInit(FlowKind),

    /// A flow submission was rejected; carries the user-facing message
    #[error("{0}")]
    Auth(String),

    /// The session check failed
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A resource request failed
    #[error("{message}")]
    Request { status: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Notification channel error.
///
/// These never reach listeners or callers of the channel; they are logged
/// where they happen.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// An inbound frame was not valid JSON
    #[error("Failed to parse notification frame: {0}")]
    Parse(#[from] serde_json::Error),

    /// A listener returned an error or panicked
    #[error("Listener failed: {0}")]
    Listener(String),

    #[error("WebSocket connect failed: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    Transport(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
