//! Centralized mutable state with key-scoped subscriptions
//!
//! The store owns four slices (`chart`, `initial`, `loading`, `errors`).
//! Readers get shallow copies; every mutation goes through the store so that
//! notification fires deterministically: first the subscribers of the changed
//! slice (in subscription order) with the new slice, then the wildcard
//! subscribers with `{ <key>: <slice> }`.

use crate::subscribers::{dispatch, Registry, SharedRegistry, Subscription};
use datamaq_shared::{
    ChartDataBundle, ErrorId, ErrorRecord, InitialData, StateKey, REQUIRED_CHART_FIELDS,
};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Maximum nesting of notifications for one slice before they are dropped.
const MAX_NOTIFY_DEPTH: usize = 16;

/// Subscription target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Slice(StateKey),
    /// Every change to any slice
    All,
}

impl Topic {
    /// Resolve a subscription key; unknown keys fall back to [`Topic::All`].
    pub fn resolve(key: &str) -> Topic {
        if key == "all" {
            return Topic::All;
        }
        match key.parse::<StateKey>() {
            Ok(slice) => Topic::Slice(slice),
            Err(_) => {
                log::warn!("StateStore - subscription to unknown key '{key}', using 'all'");
                Topic::All
            }
        }
    }
}

struct Slices {
    chart: Value,
    initial: Value,
    loading: Value,
    errors: Value,
}

impl Slices {
    fn initial() -> Self {
        Self {
            chart: json!({
                "conta": null,
                "rawdata": [],
                "ls_periodos": {},
                "menos_periodo": {},
                "periodo": "semana"
            }),
            initial: json!({
                "periodo": "semana",
                "conta": null,
                "csrfToken": null
            }),
            loading: json!({
                "dashboard": false,
                "chart": false
            }),
            errors: json!([]),
        }
    }

    fn get(&self, key: StateKey) -> &Value {
        match key {
            StateKey::Chart => &self.chart,
            StateKey::Initial => &self.initial,
            StateKey::Loading => &self.loading,
            StateKey::Errors => &self.errors,
        }
    }

    fn get_mut(&mut self, key: StateKey) -> &mut Value {
        match key {
            StateKey::Chart => &mut self.chart,
            StateKey::Initial => &mut self.initial,
            StateKey::Loading => &mut self.loading,
            StateKey::Errors => &mut self.errors,
        }
    }
}

/// The dashboard's single source of truth
pub struct StateStore {
    slices: RwLock<Slices>,
    subscribers: SharedRegistry<Topic>,
    last_error_id: AtomicU64,
    notify_depth: [AtomicUsize; 4],
}

impl StateStore {
    pub fn new() -> Self {
        log::info!("StateStore - initialized");
        Self {
            slices: RwLock::new(Slices::initial()),
            subscribers: Arc::new(Mutex::new(Registry::new())),
            last_error_id: AtomicU64::new(0),
            notify_depth: Default::default(),
        }
    }

    /// Snapshot of the whole state as `{chart, initial, loading, errors}`.
    pub fn state(&self) -> Value {
        let slices = self.slices.read();
        let mut map = Map::new();
        for key in StateKey::ALL {
            map.insert(key.as_str().to_string(), slices.get(key).clone());
        }
        Value::Object(map)
    }

    /// Shallow copy of slice `key`, or `None` for an unknown key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key.parse::<StateKey>() {
            Ok(slice) => Some(self.slice(slice)),
            Err(_) => {
                log::warn!("StateStore - read of unknown state key '{key}'");
                None
            }
        }
    }

    pub fn slice(&self, key: StateKey) -> Value {
        self.slices.read().get(key).clone()
    }

    /// Write `value` into slice `key` and notify.
    ///
    /// With `merge`, two mappings are shallow-merged (incoming keys win);
    /// anything else replaces the slice. Unknown keys are rejected with `false`.
    pub fn update(&self, key: &str, value: Value, merge: bool) -> bool {
        match key.parse::<StateKey>() {
            Ok(slice) => {
                self.update_slice(slice, value, merge);
                true
            }
            Err(_) => {
                log::warn!("StateStore - update of unknown state key '{key}'");
                false
            }
        }
    }

    pub fn update_slice(&self, key: StateKey, value: Value, merge: bool) {
        self.mutate(key, |current| match (merge, current, value) {
            (true, Value::Object(existing), Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, current, value) => *current = value,
        });
    }

    /// Store a chart bundle. Missing required fields are logged, not rejected.
    pub fn set_chart_data<T: Serialize>(&self, chart_data: &T) -> bool {
        let Some(value) = Self::object_value(chart_data, "chart") else {
            return false;
        };
        for field in REQUIRED_CHART_FIELDS {
            if !value.as_object().is_some_and(|m| m.contains_key(field)) {
                log::warn!("StateStore - incomplete chart data, missing '{field}'");
            }
        }
        self.update_slice(StateKey::Chart, value, true);
        true
    }

    pub fn get_chart_data(&self) -> Value {
        self.slice(StateKey::Chart)
    }

    /// Typed view of the `chart` slice.
    pub fn chart_data(&self) -> Option<ChartDataBundle> {
        self.decode(StateKey::Chart)
    }

    pub fn set_initial_data<T: Serialize>(&self, initial_data: &T) -> bool {
        let Some(value) = Self::object_value(initial_data, "initial") else {
            return false;
        };
        self.update_slice(StateKey::Initial, value, true);
        true
    }

    pub fn get_initial_data(&self) -> Value {
        self.slice(StateKey::Initial)
    }

    /// Typed view of the `initial` slice.
    pub fn initial_data(&self) -> Option<InitialData> {
        self.decode(StateKey::Initial)
    }

    /// Set one loading flag; subscribers see the complete flag set.
    pub fn set_loading(&self, component: &str, loading: bool) {
        self.mutate(StateKey::Loading, |current| {
            let mut flags = current.as_object().cloned().unwrap_or_default();
            flags.insert(component.to_string(), Value::Bool(loading));
            *current = Value::Object(flags);
        });
    }

    /// True when any component is loading.
    pub fn is_loading(&self) -> bool {
        self.slices
            .read()
            .loading
            .as_object()
            .is_some_and(|flags| flags.values().any(|v| v == &Value::Bool(true)))
    }

    /// Append an error and return its id.
    pub fn add_error(&self, source: &str, error: impl Display) -> ErrorId {
        let record = ErrorRecord {
            id: self.next_error_id(),
            source: source.to_string(),
            message: error.to_string(),
            timestamp: chrono::Utc::now(),
        };
        log::debug!("StateStore - error {} from {source}: {}", record.id, record.message);

        let id = record.id;
        let entry = serde_json::to_value(&record).unwrap_or(Value::Null);
        self.mutate(StateKey::Errors, move |current| match current {
            Value::Array(errors) => errors.push(entry),
            other => *other = Value::Array(vec![entry]),
        });
        id
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.decode(StateKey::Errors).unwrap_or_default()
    }

    pub fn clear_error(&self, id: ErrorId) {
        self.mutate(StateKey::Errors, |current| {
            if let Value::Array(errors) = current {
                errors.retain(|e| e.get("id").and_then(Value::as_u64) != Some(id.0));
            }
        });
    }

    pub fn clear_all_errors(&self) {
        self.update_slice(StateKey::Errors, json!([]), false);
    }

    /// Subscribe to slice `key`, or to every change with `"all"`.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_to(Topic::resolve(key), callback)
    }

    pub fn subscribe_to<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.subscribers.lock().add(topic, Arc::new(callback));
        log::debug!(
            "StateStore - new subscription to {topic:?}, total: {}",
            self.subscriber_count(topic)
        );
        Subscription::new(&self.subscribers, topic, id)
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers.lock().count(&topic)
    }

    /// Restore every slice to its empty shape, keep the subscriptions, and
    /// notify each slice.
    pub fn reset_state(&self) {
        log::info!("StateStore - resetting state");
        *self.slices.write() = Slices::initial();
        for key in StateKey::ALL {
            self.notify(key);
        }
    }

    fn mutate(&self, key: StateKey, apply: impl FnOnce(&mut Value)) {
        {
            let mut slices = self.slices.write();
            apply(slices.get_mut(key));
        }
        log::debug!("StateStore - updated '{key}'");
        self.notify(key);
    }

    fn notify(&self, key: StateKey) {
        let depth = &self.notify_depth[key as usize];
        if depth.fetch_add(1, Ordering::SeqCst) >= MAX_NOTIFY_DEPTH {
            depth.fetch_sub(1, Ordering::SeqCst);
            log::error!("StateStore - recursive updates of '{key}' exceeded {MAX_NOTIFY_DEPTH} levels, notification dropped");
            return;
        }

        let value = self.slice(key);
        let label = format!("StateStore '{key}'");
        dispatch(&self.subscribers, &Topic::Slice(key), &value, &label);

        let mut wrapped = Map::new();
        wrapped.insert(key.as_str().to_string(), value);
        dispatch(&self.subscribers, &Topic::All, &Value::Object(wrapped), &label);

        depth.fetch_sub(1, Ordering::SeqCst);
    }

    fn next_error_id(&self) -> ErrorId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_error_id.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self.last_error_id.compare_exchange(
                last,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return ErrorId(next),
                Err(actual) => last = actual,
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, key: StateKey) -> Option<T> {
        match serde_json::from_value(self.slice(key)) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::warn!("StateStore - '{key}' slice does not decode: {e}");
                None
            }
        }
    }

    fn object_value<T: Serialize>(data: &T, slice: &str) -> Option<Value> {
        match serde_json::to_value(data) {
            Ok(value @ Value::Object(_)) => Some(value),
            Ok(_) => {
                log::warn!("StateStore - refusing non-object {slice} data");
                None
            }
            Err(e) => {
                log::warn!("StateStore - cannot serialize {slice} data: {e}");
                None
            }
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
