//! Named-event publish/subscribe channel
//!
//! Emissions are momentary: a handler only sees events emitted while it is
//! registered. Nothing is queued.

use crate::subscribers::{dispatch, Callback, Registry, SharedRegistry, Subscription};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Event handler; compared by pointer identity on [`EventBus::unsubscribe`].
pub type EventHandler = Callback;

pub struct EventBus {
    handlers: SharedRegistry<String>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Invoke every handler registered for `name`, in registration order.
    pub fn emit(&self, name: &str, payload: &Value) {
        let key = name.to_string();
        if self.handlers.lock().count(&key) == 0 {
            log::trace!("EventBus - '{name}' emitted with no subscribers");
            return;
        }
        log::debug!("EventBus - emitting '{name}'");
        dispatch(&self.handlers, &key, payload, &format!("EventBus '{name}'"));
    }

    /// Serialize a typed payload and emit it.
    pub fn emit_event<T: Serialize>(&self, name: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit(name, &value),
            Err(e) => log::error!("EventBus - cannot serialize payload for '{name}': {e}"),
        }
    }

    pub fn subscribe<F>(&self, name: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_handler(name, Arc::new(handler))
    }

    /// Register a shared handler so it can later be removed by identity.
    pub fn subscribe_handler(&self, name: &str, handler: EventHandler) -> Subscription {
        let key = name.to_string();
        let id = self.handlers.lock().add(key.clone(), handler);
        log::debug!(
            "EventBus - new subscription to '{name}', total: {}",
            self.subscriber_count(name)
        );
        Subscription::new(&self.handlers, key, id)
    }

    /// Remove `handler` from `name`. Removing an absent handler is a no-op.
    pub fn unsubscribe(&self, name: &str, handler: &EventHandler) -> bool {
        self.handlers
            .lock()
            .remove_callback(&name.to_string(), handler)
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.handlers.lock().count(&name.to_string())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
