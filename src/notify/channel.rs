//! Notification channel with automatic reconnection
//!
//! # States
//!
//! ```text
//!            connect()                on open
//!  Closed ─────────────▶ Connecting ─────────▶ Open
//!    ▲                       │                  │
//!    │      close / error    │                  │
//!    └───────────────────────┴──────────────────┘
//!    │
//!    └── one reconnect after `reconnect_delay`, unless the close came
//!        from disconnect()
//! ```
//!
//! All transitions happen under one mutex that is never held across an
//! await. Every connection gets a new id; events from a connection that is
//! no longer current are ignored, which keeps late closes from scheduling a
//! second reconnect or from clobbering a newer connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::cookie::Jar;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::listeners::{Listener, ListenerSet, NotificationMessage};
use super::transport::{Connection, Connector, WsConnector};
use crate::config::ClientConfig;
use crate::error::{ChannelError, Result};
use crate::flow::Teardown;

const BROADCAST_CAPACITY: usize = 256;

/// Connection state of the channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Closed,
    Connecting,
    Open,
}

/// Persistent, self-healing connection to the notification service.
///
/// Once `connect()` has been called the channel keeps itself connected,
/// retrying every `reconnect_delay`, until `disconnect()` is called or the
/// handle is dropped. Listeners may be added at any time, including before
/// the first `connect()`.
///
/// `connect()` spawns onto the current tokio runtime.
pub struct NotificationChannel {
    shared: Arc<Shared>,
}

struct Shared {
    url: String,
    reconnect_delay: Duration,
    connector: Arc<dyn Connector>,
    listeners: ListenerSet,
    events: broadcast::Sender<NotificationMessage>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: ChannelState,
    last_id: u64,
    /// Set by disconnect(); suppresses reconnects until the next connect()
    manual_close: bool,
    connection: Option<ActiveConnection>,
    retry: Option<JoinHandle<()>>,
}

struct ActiveConnection {
    id: u64,
    shutdown: oneshot::Sender<()>,
}

impl Inner {
    fn is_current(&self, id: u64) -> bool {
        self.connection.as_ref().map(|c| c.id) == Some(id)
    }
}

impl NotificationChannel {
    /// Channel to the notification endpoint of `config`, sending the
    /// session cookies from `cookies` with every handshake.
    pub fn new(config: &ClientConfig, cookies: Option<Arc<Jar>>) -> Result<Self> {
        let url = config.notification_url()?;
        let connector = WsConnector::new(config.origin.clone(), cookies);
        Ok(Self::with_connector(
            url.as_str(),
            config.reconnect_delay,
            Arc::new(connector),
        ))
    }

    /// Channel over an arbitrary transport
    pub fn with_connector(
        url: impl Into<String>,
        reconnect_delay: Duration,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                reconnect_delay,
                connector,
                listeners: ListenerSet::new(),
                events,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Open the connection. No-op while connecting or open.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Stays closed until `connect()` is called again.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    pub fn state(&self) -> ChannelState {
        self.shared.lock().state
    }

    /// Id of the live connection, if there is one
    pub fn connection_id(&self) -> Option<u64> {
        self.shared.lock().connection.as_ref().map(|c| c.id)
    }

    /// Whether a reconnect is scheduled
    pub fn reconnect_pending(&self) -> bool {
        self.shared.lock().retry.is_some()
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn add_listener(&self, listener: Listener) {
        self.shared.listeners.add(listener);
    }

    /// Remove every registration of `listener`
    pub fn remove_listener(&self, listener: &Listener) -> usize {
        self.shared.listeners.remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Receive every message through a broadcast channel instead of a callback.
    ///
    /// Messages reach subscribers after all listeners have run.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationMessage> {
        self.shared.events.subscribe()
    }
}

impl Teardown for NotificationChannel {
    fn teardown(&self) {
        self.disconnect();
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.shared.disconnect();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(self: &Arc<Self>) {
        let mut inner = self.lock();
        if inner.state != ChannelState::Closed {
            debug!(state = ?inner.state, "Notification channel already active");
            return;
        }

        inner.manual_close = false;
        self.connect_locked(&mut inner);
    }

    /// Start a new connection. The caller holds the lock and has checked
    /// that the channel is closed.
    fn connect_locked(self: &Arc<Self>, inner: &mut Inner) {
        if let Some(retry) = inner.retry.take() {
            retry.abort();
        }

        inner.last_id += 1;
        let id = inner.last_id;
        let (shutdown, shutdown_rx) = oneshot::channel();
        inner.connection = Some(ActiveConnection { id, shutdown });
        inner.state = ChannelState::Connecting;

        info!(url = %self.url, connection = id, "Connecting notification channel");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.run_connection(id, shutdown_rx).await;
        });
    }

    fn disconnect(&self) {
        let mut inner = self.lock();
        inner.manual_close = true;

        if let Some(retry) = inner.retry.take() {
            retry.abort();
            debug!("Pending reconnect cancelled");
        }

        if let Some(connection) = inner.connection.take() {
            info!(connection = connection.id, "Disconnecting notification channel");
            // The connection task may already be gone
            let _ = connection.shutdown.send(());
        }

        inner.state = ChannelState::Closed;
    }

    /// Body of the task that owns one connection
    async fn run_connection(self: Arc<Self>, id: u64, mut shutdown: oneshot::Receiver<()>) {
        let result = tokio::select! {
            result = self.connector.connect(&self.url) => result,
            _ = &mut shutdown => {
                debug!(connection = id, "Disconnected while connecting");
                self.on_close(id);
                return;
            }
        };

        match result {
            Ok(mut connection) => {
                if self.on_open(id) {
                    self.pump(id, connection.as_mut(), &mut shutdown).await;
                } else {
                    connection.close().await;
                }
            }
            Err(e) => {
                error!(connection = id, error = %e, "Notification channel error");
            }
        }

        self.on_close(id);
    }

    async fn pump(
        &self,
        id: u64,
        connection: &mut dyn Connection,
        shutdown: &mut oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    connection.close().await;
                    return;
                }
                frame = connection.recv() => match frame {
                    Ok(Some(frame)) => self.dispatch(&frame),
                    Ok(None) => return,
                    Err(e) => {
                        error!(connection = id, error = %e, "Notification channel error");
                        return;
                    }
                },
            }
        }
    }

    /// Deliver one inbound frame. A frame that is not JSON is dropped.
    fn dispatch(&self, frame: &[u8]) {
        let message: NotificationMessage = match serde_json::from_slice(frame) {
            Ok(message) => message,
            Err(e) => {
                let error = ChannelError::from(e);
                error!(error = %error, "Dropping notification frame");
                return;
            }
        };

        self.listeners.dispatch(&message);

        // No subscribers is fine
        let _ = self.events.send(message);
    }

    fn on_open(&self, id: u64) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(id) {
            debug!(connection = id, "Connection replaced before it opened");
            return false;
        }

        inner.state = ChannelState::Open;
        info!(connection = id, "Notification channel connected");
        true
    }

    fn on_close(self: &Arc<Self>, id: u64) {
        let mut inner = self.lock();
        if !inner.is_current(id) {
            debug!(connection = id, "Ignoring close of a replaced connection");
            return;
        }

        inner.connection = None;
        inner.state = ChannelState::Closed;

        if inner.manual_close {
            debug!(connection = id, "Notification channel closed");
            return;
        }

        info!(
            connection = id,
            delay = ?self.reconnect_delay,
            "Notification channel disconnected, reconnecting"
        );

        let shared = Arc::clone(self);
        let delay = self.reconnect_delay;
        inner.retry = Some(tokio::spawn(async move {
            sleep(delay).await;
            shared.fire_retry();
        }));
    }

    fn fire_retry(self: &Arc<Self>) {
        // Check and connect under one lock so a disconnect() cannot slip in between
        let mut inner = self.lock();
        inner.retry = None;
        if inner.manual_close || inner.state != ChannelState::Closed {
            return;
        }
        self.connect_locked(&mut inner);
    }
}
