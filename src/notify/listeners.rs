//! Listener registry for the notification channel

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::warn;

use crate::error::ChannelError;

/// A notification payload, delivered exactly as the server sent it
pub type NotificationMessage = Value;

/// Callback invoked once per inbound notification.
///
/// Identity is the `Arc` allocation: keep a clone around to remove it later.
pub type Listener = Arc<dyn Fn(&NotificationMessage) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&NotificationMessage) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered set of listeners.
///
/// Insertion order is invocation order. The same listener may be added more
/// than once; removal drops every entry with the same identity.
#[derive(Default)]
pub struct ListenerSet {
    entries: RwLock<Vec<Listener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener) {
        self.write().push(listener);
    }

    /// Remove every registration of `listener`; returns how many were removed
    pub fn remove(&self, listener: &Listener) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|l| !same_listener(l, listener));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener with `message`, in registration order.
    ///
    /// Runs over a snapshot, so listeners may add or remove listeners while
    /// being invoked; that only affects later dispatches. A listener that
    /// fails or panics is logged and skipped. Returns the number of failures.
    pub fn dispatch(&self, message: &NotificationMessage) -> usize {
        let snapshot: Vec<Listener> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = 0;
        for (index, listener) in snapshot.iter().enumerate() {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| listener(message))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => ChannelError::Listener(e.to_string()),
                Err(payload) => ChannelError::Listener(panic_message(payload.as_ref())),
            };

            failures += 1;
            warn!(listener = index, error = %error, "Notification listener failed");
        }
        failures
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Listener>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        listener(move |_| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        set.add(recorder(&log, "l1"));
        set.add(recorder(&log, "l2"));
        set.add(recorder(&log, "l3"));

        assert_eq!(set.dispatch(&json!({"type": "server.updated"})), 0);
        assert_eq!(*log.lock().unwrap(), vec!["l1", "l2", "l3"]);
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        set.add(recorder(&log, "l1"));
        set.add(listener(|_| anyhow::bail!("listener rejected message")));
        set.add(listener(|_| panic!("listener blew up")));
        set.add(recorder(&log, "l3"));

        assert_eq!(set.dispatch(&json!(1)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["l1", "l3"]);
    }

    #[test]
    fn test_duplicates_and_removal_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        let twice = recorder(&log, "twice");
        let other = recorder(&log, "other");
        set.add(Arc::clone(&twice));
        set.add(Arc::clone(&other));
        set.add(Arc::clone(&twice));

        set.dispatch(&json!(null));
        assert_eq!(*log.lock().unwrap(), vec!["twice", "other", "twice"]);

        // Same closure body, different allocation: not the same listener
        let lookalike = recorder(&log, "twice");
        assert_eq!(set.remove(&lookalike), 0);

        assert_eq!(set.remove(&twice), 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_removal_during_dispatch_applies_to_next_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = Arc::new(ListenerSet::new());
        let victim = recorder(&log, "victim");

        let remover = {
            let set = Arc::clone(&set);
            let victim = Arc::clone(&victim);
            let log = Arc::clone(&log);
            listener(move |_| {
                log.lock().unwrap().push("remover".to_string());
                set.remove(&victim);
                Ok(())
            })
        };

        set.add(Arc::clone(&victim));
        set.add(remover);
        set.add(recorder(&log, "after"));

        set.dispatch(&json!({}));
        set.dispatch(&json!({}));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["victim", "remover", "after", "remover", "after"]
        );
    }
}
