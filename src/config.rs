//! Client configuration
//!
//! Everything is addressed relative to one origin, the same way a page
//! served from that origin would address the identity service, the hosting
//! API and the notification endpoint.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, Result};

/// Configuration for the hosting client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin the platform is served from (e.g. "https://hosting.example.com")
    pub origin: Url,
    /// Path prefix of the identity service
    pub auth_base: String,
    /// Path prefix of the hosting resource API
    pub api_base: String,
    /// Path of the notification WebSocket endpoint
    pub notification_path: String,
    /// Unauthenticated entry point the caller is sent to after logout
    pub entry_point: String,
    /// Delay before reconnecting a dropped notification channel
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8080").expect("static origin is valid"),
            auth_base: "/auth".to_string(),
            api_base: "/api/hosting".to_string(),
            notification_path: "/api/notification/ws".to_string(),
            entry_point: "/login.html".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given origin with default paths
    pub fn new(origin: &str) -> Result<Self> {
        Ok(Self {
            origin: Url::parse(origin)?,
            ..Default::default()
        })
    }

    /// Create config from environment
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let origin = match std::env::var("HOSTING_ORIGIN") {
            Ok(origin) => Url::parse(&origin)?,
            Err(_) => defaults.origin,
        };

        Ok(Self {
            origin,
            auth_base: std::env::var("HOSTING_AUTH_BASE").unwrap_or(defaults.auth_base),
            api_base: std::env::var("HOSTING_API_BASE").unwrap_or(defaults.api_base),
            notification_path: std::env::var("HOSTING_NOTIFICATION_PATH")
                .unwrap_or(defaults.notification_path),
            entry_point: std::env::var("HOSTING_ENTRY_POINT").unwrap_or(defaults.entry_point),
            reconnect_delay: std::env::var("HOSTING_RECONNECT_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconnect_delay),
        })
    }

    /// URL of an identity service endpoint
    pub fn auth_url(&self, path: &str) -> Result<Url> {
        self.join(&self.auth_base, path)
    }

    /// URL of a hosting API endpoint
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.join(&self.api_base, path)
    }

    /// URL of the notification endpoint.
    ///
    /// The scheme is upgraded to `wss` only when the origin itself is `https`.
    pub fn notification_url(&self) -> Result<Url> {
        let scheme = if self.origin.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };

        let mut url = self.origin.clone();
        url.set_scheme(scheme).map_err(|_| {
            ClientError::Config(format!(
                "origin {} cannot be mapped to a WebSocket URL",
                self.origin
            ))
        })?;
        url.set_path(&self.notification_path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    fn join(&self, base: &str, path: &str) -> Result<Url> {
        let full = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(self.origin.join(&full)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.origin.as_str(), "http://localhost:8080/");
        assert_eq!(config.entry_point, "/login.html");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_auth_and_api_urls() {
        let config = ClientConfig::new("https://hosting.test.local").unwrap();
        assert_eq!(
            config
                .auth_url("/self-service/login/browser")
                .unwrap()
                .as_str(),
            "https://hosting.test.local/auth/self-service/login/browser"
        );
        assert_eq!(
            config.api_url("plans").unwrap().as_str(),
            "https://hosting.test.local/api/hosting/plans"
        );
    }

    #[test]
    fn test_notification_url_follows_origin_security() {
        let secure = ClientConfig::new("https://hosting.test.local").unwrap();
        assert_eq!(
            secure.notification_url().unwrap().as_str(),
            "wss://hosting.test.local/api/notification/ws"
        );

        let plain = ClientConfig::new("http://localhost:3000/app?x=1").unwrap();
        assert_eq!(
            plain.notification_url().unwrap().as_str(),
            "ws://localhost:3000/api/notification/ws"
        );
    }

    #[test]
    fn test_invalid_origin() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
