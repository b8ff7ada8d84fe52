//! Callback registry shared by the state store and the event bus

use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Subscriber callback; receives the notified value by reference.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifier of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    callback: Callback,
}

/// Ordered callback lists keyed by topic
pub(crate) struct Registry<K> {
    next_id: u64,
    topics: HashMap<K, Vec<Entry>>,
}

impl<K: Eq + Hash + Clone> Registry<K> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            topics: HashMap::new(),
        }
    }

    pub(crate) fn add(&mut self, topic: K, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.topics
            .entry(topic)
            .or_default()
            .push(Entry { id, callback });
        id
    }

    pub(crate) fn remove(&mut self, topic: &K, id: SubscriptionId) -> bool {
        self.retain(topic, |entry| entry.id != id)
    }

    /// Remove every registration of `callback` (pointer identity).
    pub(crate) fn remove_callback(&mut self, topic: &K, callback: &Callback) -> bool {
        let target = Arc::as_ptr(callback) as *const ();
        self.retain(topic, |entry| Arc::as_ptr(&entry.callback) as *const () != target)
    }

    fn retain(&mut self, topic: &K, keep: impl Fn(&Entry) -> bool) -> bool {
        let Some(entries) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| keep(entry));
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    pub(crate) fn contains(&self, topic: &K, id: SubscriptionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    /// Registrations for `topic` in subscription order.
    pub(crate) fn snapshot(&self, topic: &K) -> Vec<(SubscriptionId, Callback)> {
        self.topics
            .get(topic)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.id, Arc::clone(&e.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, topic: &K) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }
}

pub(crate) type SharedRegistry<K> = Arc<Mutex<Registry<K>>>;

/// Invoke each registration in order, skipping any removed mid-dispatch.
///
/// A panicking callback is logged and does not stop the remaining ones.
pub(crate) fn dispatch<K: Eq + Hash + Clone>(
    registry: &SharedRegistry<K>,
    topic: &K,
    value: &Value,
    label: &str,
) {
    let callbacks = registry.lock().snapshot(topic);
    for (id, callback) in callbacks {
        if !registry.lock().contains(topic, id) {
            continue;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
            log::error!("{label}: subscriber failed: {}", panic_message(&payload));
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Disposer returned by `subscribe`.
///
/// Dropping it leaves the callback registered; call [`Subscription::unsubscribe`]
/// to remove exactly that registration.
pub struct Subscription {
    id: SubscriptionId,
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<K>(registry: &SharedRegistry<K>, topic: K, id: SubscriptionId) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
    {
        let registry: Weak<Mutex<Registry<K>>> = Arc::downgrade(registry);
        Self {
            id,
            dispose: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().remove(&topic, id);
                }
            })),
        }
    }

    /// A disposer for a registration that never happened.
    pub(crate) fn noop() -> Self {
        Self {
            id: SubscriptionId(0),
            dispose: None,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
