//! Central state store and event bus for the dashboard
//!
//! Both are plain values constructed once by the composition root and shared
//! through `Arc`; there are no module-level singletons. Notifications and
//! emissions run synchronously on the caller's thread and complete before the
//! triggering call returns.

pub mod event_bus;
pub mod state_store;
mod subscribers;

pub use event_bus::{EventBus, EventHandler};
pub use state_store::{StateStore, Topic};
pub use subscribers::{Callback, Subscription, SubscriptionId};
