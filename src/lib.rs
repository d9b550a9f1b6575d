//! Rust client for the hosting platform
//!
//! Two independent pieces share one cookie session:
//!
//! - [`IdentityClient`] runs the identity service's self-service flows
//!   (login, registration, logout) and the session check.
//! - [`NotificationChannel`] keeps a WebSocket to the notification service
//!   open and fans every message out to registered listeners.
//!
//! [`ResourceClient`] covers the plan and server endpoints.
//!
//! # Example
//!
//! ```rust,no_run
//! use hosting_client::{listener, ClientConfig, HostingClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HostingClient::new(ClientConfig::new("https://hosting.example.com")?)?;
//!
//! client.identity().login("ada@example.com", "correct horse").await?;
//!
//! let channel = client.notification_channel()?;
//! channel.add_listener(listener(|message| {
//!     println!("notification: {}", message);
//!     Ok(())
//! }));
//! channel.connect();
//!
//! let servers = client.resources().list_servers(1, 20).await?;
//! println!("{} servers", servers.page.total_elements);
//!
//! client
//!     .identity()
//!     .logout(&channel, &|location: &str| println!("go to {}", location))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod http;
pub mod notify;
pub mod resources;

pub use config::ClientConfig;
pub use error::{ChannelError, ClientError, Result};
pub use flow::{IdentityClient, Navigator, RegistrationResult, Session, Teardown};
pub use http::HttpContext;
pub use notify::{
    listener, ChannelState, Listener, NotificationChannel, NotificationEvent, NotificationMessage,
};
pub use resources::ResourceClient;

/// Entry point: one HTTP context handed to every component
#[derive(Clone)]
pub struct HostingClient {
    http: HttpContext,
    identity: IdentityClient,
    resources: ResourceClient,
}

impl HostingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpContext::new(config)?;

        Ok(Self {
            identity: IdentityClient::new(http.clone()),
            resources: ResourceClient::new(http.clone()),
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    pub fn resources(&self) -> &ResourceClient {
        &self.resources
    }

    /// A new, not yet connected, notification channel using this client's
    /// session cookies
    pub fn notification_channel(&self) -> Result<NotificationChannel> {
        NotificationChannel::new(self.http.config(), Some(self.http.cookies()))
    }
}
