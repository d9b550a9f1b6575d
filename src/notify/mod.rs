//! Notification channel
//!
//! | Module       | Responsibility                                      |
//! |--------------|-----------------------------------------------------|
//! | `transport`  | WebSocket connect/receive behind `Connector`        |
//! | `listeners`  | Ordered listener registry with isolated dispatch    |
//! | `channel`    | Connection state machine and reconnect scheduling   |
//! | `event`      | Typed view of known notification events             |

mod channel;
mod event;
mod listeners;
mod transport;

pub use channel::{ChannelState, NotificationChannel};
pub use event::{NotificationEvent, ServerStatusChanged, SERVER_STATUS_UPDATED};
pub use listeners::{listener, Listener, ListenerSet, NotificationMessage};
pub use transport::{Connection, Connector, WsConnector};
