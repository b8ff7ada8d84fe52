//! Chart lifecycle controller
//!
//! Owns the chart instance and decides when it is (re)built: on page
//! ready, when the store publishes a new bundle, when the mount point
//! appears, and from a bounded periodic safety check. Every failure is
//! charged to one shared budget; the failure kind only decides whether the
//! scheduled retry re-fetches the bundle first.
//!
//! Background work (retries, deferred initializations, the periodic check)
//! runs on the ambient tokio runtime and holds only a weak reference to the
//! controller, so dropping the last handle stops it.

use crate::click::{ClickDisambiguator, ClickHandler};
use crate::dom::{DomHost, MountNode};
use crate::error_recovery::{FailureBudget, FailureKind, RecoveryAction, RecoveryStats};
use crate::lifecycle::{ChartPhase, PhaseTracker};
use crate::navigation::{Navigator, ZoomTarget};
use crate::readiness::wait_until;
use crate::render::{ChartCallbacks, ChartHandle, ChartRenderer, RenderConfig};
use crate::IntegrationError;
use datamaq_config::ChartSettings;
use datamaq_data::{ChartDataValidator, DashboardService, SeriesBuilder};
use datamaq_shared::events::{
    ChartDataUpdated, ChartPointSelected, ChartReady, APP_DOM_READY, CHART_DATA_UPDATED,
    CHART_POINT_SELECTED, CHART_READY, CONTAINER_READY,
};
use datamaq_shared::{now_millis, ApiResponse, ChartDataBundle, InitialData};
use datamaq_store::{EventBus, StateStore, Subscription};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

/// Error source recorded in the store
pub const ERROR_SOURCE: &str = "chartController";
const LOADING_COMPONENT: &str = "chart";
const RENDER_ERROR_HTML: &str =
    "<div class=\"chart-error\">Error al cargar el gráfico. Intente recargar la página.</div>";

/// Collaborators the controller drives
#[derive(Clone)]
pub struct ControllerDeps {
    pub store: Arc<StateStore>,
    pub bus: Arc<EventBus>,
    pub service: Arc<DashboardService>,
    pub dom: Arc<dyn DomHost>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub navigator: Arc<dyn Navigator>,
}

/// Result of one initialization request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitOutcome {
    Rendered,
    /// The primary render failed and the minimal chart was drawn instead
    RenderedFallback,
    /// Already initialized with the current bundle; nothing to do
    AlreadyInitialized,
    /// Another cycle is running
    InProgress,
    Failed(FailureKind),
    /// The controller was shut down
    Stopped,
}

/// Snapshot for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub phase: ChartPhase,
    pub initialized: bool,
    pub data_received: bool,
    pub has_chart_data: bool,
    pub has_initial_data: bool,
    pub failed_attempts: u32,
    pub max_failed_attempts: u32,
    pub phase_transitions: u64,
    pub last_failure: Option<String>,
    pub recovery: RecoveryStats,
}

#[derive(Default)]
struct ChartState {
    initial_data: Option<InitialData>,
    chart_data: Option<ChartDataBundle>,
    /// The bundle changed since the last successful render
    dirty: bool,
    initialized: bool,
    data_received: bool,
    handle: Option<ChartHandle>,
}

#[derive(Default)]
struct Timers {
    periodic: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
    deferred: Vec<JoinHandle<()>>,
}

struct Inner {
    settings: ChartSettings,
    deps: ControllerDeps,
    validator: ChartDataValidator,
    series: SeriesBuilder,
    state: Mutex<ChartState>,
    phases: PhaseTracker,
    budget: FailureBudget,
    clicks: Arc<ClickDisambiguator>,
    in_flight: AtomicBool,
    stopped: AtomicBool,
    timers: Mutex<Timers>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Clears the in-flight flag however the cycle ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct ChartLifecycleController {
    inner: Arc<Inner>,
}

impl ChartLifecycleController {
    pub fn new(settings: ChartSettings, deps: ControllerDeps) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let on_single: ClickHandler = {
                let weak = weak.clone();
                Arc::new(move |x| {
                    if let Some(inner) = weak.upgrade() {
                        inner.process_single_click(x);
                    }
                })
            };
            let on_double: ClickHandler = {
                let weak = weak.clone();
                Arc::new(move |x| {
                    if let Some(inner) = weak.upgrade() {
                        inner.process_double_click(x);
                    }
                })
            };

            Inner {
                validator: ChartDataValidator::new(),
                series: SeriesBuilder::new(settings.value_divisor, settings.marcha_value),
                state: Mutex::new(ChartState::default()),
                phases: PhaseTracker::new(),
                budget: FailureBudget::new(settings.max_failed_attempts),
                clicks: ClickDisambiguator::new(settings.click_delay(), on_single, on_double),
                in_flight: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                timers: Mutex::new(Timers::default()),
                subscriptions: Mutex::new(Vec::new()),
                settings,
                deps,
            }
        });

        Self { inner }
    }

    /// Take the page context and the first bundle, subscribe to the bus and
    /// start the periodic check.
    pub fn init(&self, initial: Option<InitialData>, chart: Option<ChartDataBundle>) {
        self.inner.stopped.store(false, Ordering::SeqCst);
        if let Some(initial) = initial {
            self.set_initial_data(initial);
        }
        self.set_chart_data(chart);
        self.log_chart_data_status();
        self.inner.setup_event_listeners();
        self.inner.start_periodic_check();
    }

    pub fn set_initial_data(&self, initial: InitialData) {
        self.inner.state.lock().initial_data = Some(initial);
    }

    /// Replace the cached bundle. A different bundle is rendered by the next
    /// initialization even when a chart is already up.
    pub fn set_chart_data(&self, chart: Option<ChartDataBundle>) {
        self.inner.set_chart_data(chart);
    }

    pub fn chart_data(&self) -> Option<ChartDataBundle> {
        self.inner.state.lock().chart_data.clone()
    }

    /// Run one initialization cycle with the cached bundle.
    pub fn init_chart(&self) -> BoxFuture<'static, InitOutcome> {
        Inner::run_cycle(Arc::clone(&self.inner))
    }

    /// Re-fetch the bundle for the current page context, then initialize.
    pub fn force_chart_data_load(&self) -> BoxFuture<'static, InitOutcome> {
        Inner::force_reload(Arc::clone(&self.inner))
    }

    pub fn setup_event_listeners(&self) {
        self.inner.setup_event_listeners();
    }

    pub fn start_periodic_check(&self) {
        self.inner.start_periodic_check();
    }

    /// Entry point for raw chart clicks at x-axis value `x`.
    pub fn handle_chart_click(&self, x: f64) {
        self.inner.clicks.handle_click(x);
    }

    /// The charting library reported that the chart finished loading.
    pub fn handle_chart_load(&self) {
        self.inner.handle_chart_load();
    }

    pub fn phase(&self) -> ChartPhase {
        self.inner.phases.current()
    }

    pub fn phase_history(&self) -> Vec<ChartPhase> {
        self.inner.phases.history()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    pub fn failed_attempts(&self) -> u32 {
        self.inner.budget.failed_attempts()
    }

    pub fn status(&self) -> ControllerStatus {
        let (initialized, data_received, has_chart_data, has_initial_data) = {
            let state = self.inner.state.lock();
            (
                state.initialized,
                state.data_received,
                state.chart_data.is_some(),
                state.initial_data.is_some(),
            )
        };
        ControllerStatus {
            phase: self.inner.phases.current(),
            initialized,
            data_received,
            has_chart_data,
            has_initial_data,
            failed_attempts: self.inner.budget.failed_attempts(),
            max_failed_attempts: self.inner.budget.max_failed_attempts(),
            phase_transitions: self.inner.phases.stats().transitions,
            last_failure: self
                .inner
                .budget
                .last_failure()
                .map(|(kind, message)| format!("{kind:?}: {message}")),
            recovery: self.inner.budget.stats(),
        }
    }

    /// Log what the controller currently holds; `true` when a bundle is cached.
    pub fn log_chart_data_status(&self) -> bool {
        let status = self.status();
        log::info!(
            "ChartController - status: chart_data={} initial_data={} initialized={} phase={:?}",
            status.has_chart_data,
            status.has_initial_data,
            status.initialized,
            status.phase
        );
        status.has_chart_data
    }

    /// Stop every timer and listener and destroy the chart.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.stopped.store(true, Ordering::SeqCst);
        inner.cancel_background();
        for task in inner.timers.lock().deferred.drain(..) {
            task.abort();
        }
        inner.clicks.cancel();
        for subscription in inner.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }

        let handle = {
            let mut state = inner.state.lock();
            state.initialized = false;
            state.handle.take()
        };
        if let Some(handle) = handle {
            inner.deps.renderer.destroy(handle);
        }
        inner.enter(ChartPhase::Idle);
        log::info!("ChartController - shut down");
    }
}

impl Inner {
    fn set_chart_data(&self, chart: Option<ChartDataBundle>) {
        let mut state = self.state.lock();
        if chart.is_some() && chart != state.chart_data {
            state.dirty = true;
        }
        state.chart_data = chart;
    }

    fn enter(&self, next: ChartPhase) {
        if self.phases.current() == next {
            return;
        }
        if let Err(e) = self.phases.transition_to(next) {
            log::debug!("ChartController - {e}");
        }
    }

    fn run_cycle(self: Arc<Self>) -> BoxFuture<'static, InitOutcome> {
        Box::pin(async move {
            if self.stopped.load(Ordering::SeqCst) {
                return InitOutcome::Stopped;
            }
            if self.is_current() {
                log::debug!("ChartController - chart already initialized with this data");
                return InitOutcome::AlreadyInitialized;
            }
            if self.in_flight.swap(true, Ordering::SeqCst) {
                log::debug!("ChartController - initialization already in progress");
                return InitOutcome::InProgress;
            }
            let _guard = InFlightGuard(&self.in_flight);

            self.deps.store.set_loading(LOADING_COMPONENT, true);
            let outcome = self.cycle().await;
            self.deps.store.set_loading(LOADING_COMPONENT, false);
            log::debug!("ChartController - initialization finished: {outcome:?}");
            outcome
        })
    }

    fn is_current(&self) -> bool {
        let state = self.state.lock();
        state.initialized && !state.dirty
    }

    async fn cycle(self: &Arc<Self>) -> InitOutcome {
        self.enter(ChartPhase::AwaitingData);
        let cached = self.state.lock().chart_data.clone();
        let Some(bundle) = cached else {
            return self.fail(
                FailureKind::MissingData,
                IntegrationError::MissingData("no bundle cached".to_string()).to_string(),
            );
        };

        if !self.deps.renderer.is_available() {
            return self.fail(
                FailureKind::Library,
                IntegrationError::LibraryUnavailable.to_string(),
            );
        }

        self.enter(ChartPhase::AwaitingContainer);
        let Some(node) = self.await_container().await else {
            return self.fail(
                FailureKind::Container,
                IntegrationError::Container(format!(
                    "'{}' missing and parent '{}' not found",
                    self.settings.container_id, self.settings.parent_id
                ))
                .to_string(),
            );
        };

        self.enter(ChartPhase::Validating);
        if !self.validator.validate_bundle(Some(&bundle)) {
            return self.fail(FailureKind::Validation, "chart data failed validation");
        }
        self.state.lock().data_received = true;

        self.enter(ChartPhase::Rendering);
        self.render(&node, &bundle)
    }

    async fn await_container(&self) -> Option<MountNode> {
        let dom = &self.deps.dom;
        let id = self.settings.container_id.as_str();
        match wait_until(
            || dom.find_element(id),
            self.settings.container_poll(),
            self.settings.container_wait(),
        )
        .await
        {
            Ok(node) => Some(node),
            Err(timeout) => {
                log::warn!("ChartController - container '{id}' not found: {timeout}");
                let node = dom.create_element(
                    &self.settings.parent_id,
                    id,
                    &self.settings.container_class,
                );
                match &node {
                    Some(_) => log::info!(
                        "ChartController - created container '{id}' under '{}'",
                        self.settings.parent_id
                    ),
                    None => log::error!(
                        "ChartController - parent '{}' not found, cannot create '{id}'",
                        self.settings.parent_id
                    ),
                }
                node
            }
        }
    }

    /// Draw `bundle`, falling back to the minimal chart and finally to an
    /// inline error message. No lock is held while the library runs; it may
    /// call the load callback before returning.
    fn render(self: &Arc<Self>, node: &MountNode, bundle: &ChartDataBundle) -> InitOutcome {
        let previous = self.state.lock().handle.take();
        if let Some(previous) = previous {
            log::debug!("ChartController - destroying chart {previous:?}");
            self.deps.renderer.destroy(previous);
        }

        let series = self.series.build_series(bundle);
        let callbacks = self.callbacks();
        let primary = RenderConfig::for_bundle(bundle, series, callbacks.clone());

        let (result, fallback) = match self.deps.renderer.render(node, primary) {
            Ok(handle) => (Ok(handle), false),
            Err(e) => {
                log::error!("ChartController - render failed: {e}; trying the fallback chart");
                let config = RenderConfig::fallback(now_millis() as f64, callbacks);
                (self.deps.renderer.render(node, config), true)
            }
        };

        match result {
            Ok(handle) => {
                if !self.complete(handle, bundle) {
                    log::info!("ChartController - chart data changed while rendering, re-initializing");
                    self.schedule_deferred_init();
                }
                if fallback {
                    InitOutcome::RenderedFallback
                } else {
                    InitOutcome::Rendered
                }
            }
            Err(e) => {
                log::error!("ChartController - fallback render failed: {e}");
                self.deps.dom.set_inner_html(node, RENDER_ERROR_HTML);
                self.fail(
                    FailureKind::Render,
                    IntegrationError::Render(e.to_string()).to_string(),
                )
            }
        }
    }

    /// Record a successful render of `rendered`. Returns `false` when the
    /// cache moved on to another bundle during the cycle; it stays dirty.
    fn complete(&self, handle: ChartHandle, rendered: &ChartDataBundle) -> bool {
        let current = {
            let mut state = self.state.lock();
            state.handle = Some(handle);
            state.initialized = true;
            let current = state.chart_data.as_ref() == Some(rendered);
            if current {
                state.dirty = false;
            }
            current
        };
        self.budget.record_success();
        self.enter(ChartPhase::Ready);
        self.cancel_background();
        log::info!("ChartController - chart initialized ({handle:?})");
        current
    }

    /// Charge a failure to the budget and schedule the recovery it allows.
    fn fail(self: &Arc<Self>, kind: FailureKind, message: impl Into<String>) -> InitOutcome {
        let message = message.into();
        // Load failures are already recorded by the data service.
        if kind != FailureKind::DataLoad {
            self.deps.store.add_error(ERROR_SOURCE, &message);
        }

        match self.budget.record_failure(kind, message) {
            RecoveryAction::GiveUp => {
                self.enter(ChartPhase::Exhausted);
                self.cancel_background();
                log::error!(
                    "ChartController - giving up after {} failed attempts",
                    self.budget.failed_attempts()
                );
            }
            action => {
                self.enter(ChartPhase::ErrorBackoff);
                self.schedule_retry(action);
            }
        }
        InitOutcome::Failed(kind)
    }

    fn schedule_retry(self: &Arc<Self>, action: RecoveryAction) {
        let delay = self.settings.retry_delay();
        let weak = Arc::downgrade(self);
        let task: BoxFuture<'static, ()> = Box::pin(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // From here the retry runs to completion.
            inner.timers.lock().retry = None;
            log::info!("ChartController - retrying ({action:?})");
            match action {
                RecoveryAction::RetryWithReload => {
                    Inner::force_reload(inner).await;
                }
                _ => {
                    Inner::run_cycle(inner).await;
                }
            }
        });

        if let Some(handle) = self.spawn(task) {
            if let Some(previous) = self.timers.lock().retry.replace(handle) {
                previous.abort();
            }
        }
    }

    fn force_reload(self: Arc<Self>) -> BoxFuture<'static, InitOutcome> {
        Box::pin(async move {
            if self.stopped.load(Ordering::SeqCst) {
                return InitOutcome::Stopped;
            }
            let initial = self.state.lock().initial_data.clone();
            let Some(initial) = initial else {
                log::warn!("ChartController - no initial data, cannot reload");
                return self.fail(
                    FailureKind::MissingData,
                    IntegrationError::MissingData("initial data not set".to_string()).to_string(),
                );
            };

            log::info!(
                "ChartController - reloading chart data for periodo={}",
                initial.periodo
            );
            let response = self
                .deps
                .service
                .get_dashboard_data(Some(initial.periodo), initial.conta)
                .await;
            match response {
                ApiResponse::Success { data } => {
                    self.set_chart_data(Some(data));
                    Inner::run_cycle(self).await
                }
                ApiResponse::Error { message } => self.fail(
                    FailureKind::DataLoad,
                    IntegrationError::DataLoad(message).to_string(),
                ),
            }
        })
    }

    fn callbacks(self: &Arc<Self>) -> ChartCallbacks {
        let on_load = {
            let weak = Arc::downgrade(self);
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_chart_load();
                }
            })
        };
        let on_click = {
            let weak = Arc::downgrade(self);
            Arc::new(move |x: f64| {
                if let Some(inner) = weak.upgrade() {
                    inner.clicks.handle_click(x);
                }
            })
        };
        ChartCallbacks { on_load, on_click }
    }

    fn handle_chart_load(&self) {
        self.state.lock().initialized = true;
        log::info!("ChartController - chart loaded");
        self.deps.bus.emit_event(
            CHART_READY,
            &ChartReady {
                timestamp: now_millis(),
            },
        );
    }

    fn process_single_click(&self, x: f64) {
        if self.state.lock().chart_data.is_none() {
            log::warn!("ChartController - click at {x} ignored, no chart data");
            return;
        }
        log::debug!("ChartController - point selected at {x}");
        self.deps
            .bus
            .emit_event(CHART_POINT_SELECTED, &ChartPointSelected { x });
    }

    fn process_double_click(&self, x: f64) {
        let cached = self.state.lock().chart_data.clone();
        let Some(bundle) = cached.or_else(|| self.deps.store.chart_data()) else {
            log::warn!("ChartController - double click at {x} ignored, no chart data");
            return;
        };
        if let Some(target) = ZoomTarget::from_click(&bundle, x) {
            let query = target.query_string();
            log::info!("ChartController - drilling down to {query}");
            self.deps.navigator.navigate(&query);
        }
    }

    fn setup_event_listeners(self: &Arc<Self>) {
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            log::debug!("ChartController - listeners already registered");
            return;
        }
        let bus = &self.deps.bus;

        let weak = Arc::downgrade(self);
        subscriptions.push(bus.subscribe(APP_DOM_READY, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_app_dom_ready();
            }
        }));

        let weak = Arc::downgrade(self);
        subscriptions.push(bus.subscribe(CHART_DATA_UPDATED, move |payload| {
            if let Some(inner) = weak.upgrade() {
                inner.on_chart_data_updated(payload);
            }
        }));

        let weak = Arc::downgrade(self);
        subscriptions.push(bus.subscribe(CONTAINER_READY, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_container_ready();
            }
        }));
        log::debug!("ChartController - listeners registered");
    }

    fn on_app_dom_ready(self: &Arc<Self>) {
        if self.state.lock().chart_data.is_none() {
            log::warn!("ChartController - page ready without chart data, waiting for an update");
            return;
        }
        let this = Arc::clone(self);
        self.spawn_deferred(Box::pin(async move {
            Inner::run_cycle(this).await;
        }));
    }

    fn on_chart_data_updated(self: &Arc<Self>, payload: &Value) {
        let bundle = match serde_json::from_value::<ChartDataUpdated>(payload.clone()) {
            Ok(update) => update.chart_data,
            Err(e) => {
                log::warn!("ChartController - unreadable chart data update: {e}");
                None
            }
        };

        let Some(bundle) = bundle else {
            let has_data = self.state.lock().chart_data.is_some();
            if !has_data {
                log::warn!("ChartController - update without data, forcing a reload");
                let this = Arc::clone(self);
                self.spawn_deferred(Box::pin(async move {
                    Inner::force_reload(this).await;
                }));
            }
            return;
        };

        {
            let state = self.state.lock();
            if state.initialized && state.chart_data.as_ref() == Some(&bundle) {
                log::debug!("ChartController - chart data unchanged, update ignored");
                return;
            }
        }
        self.set_chart_data(Some(bundle));
        self.schedule_deferred_init();
    }

    fn on_container_ready(self: &Arc<Self>) {
        let ready = {
            let state = self.state.lock();
            state.chart_data.is_some() && !state.initialized
        };
        if ready {
            self.schedule_deferred_init();
        }
    }

    fn schedule_deferred_init(self: &Arc<Self>) {
        let delay = self.settings.data_event_delay();
        let weak = Arc::downgrade(self);
        self.spawn_deferred(Box::pin(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Inner::run_cycle(inner).await;
            }
        }));
    }

    fn spawn_deferred(&self, task: BoxFuture<'static, ()>) {
        if let Some(handle) = self.spawn(task) {
            let mut timers = self.timers.lock();
            timers.deferred.retain(|task| !task.is_finished());
            timers.deferred.push(handle);
        }
    }

    fn start_periodic_check(self: &Arc<Self>) {
        let mut timers = self.timers.lock();
        if timers.periodic.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        if self.state.lock().initialized {
            return;
        }

        let interval = self.settings.periodic_check_interval();
        let max_attempts = self.settings.periodic_check_max_attempts;
        let weak = Arc::downgrade(self);
        timers.periodic = self.spawn(Box::pin(async move {
            for attempt in 1..=max_attempts {
                tokio::time::sleep(interval).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.periodic_probe(attempt, max_attempts).await {
                    break;
                }
            }
            log::debug!("ChartController - periodic check finished");
        }));
    }

    /// One periodic check; `false` stops the check.
    async fn periodic_probe(self: &Arc<Self>, attempt: u32, max_attempts: u32) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        let (has_data, initialized) = {
            let state = self.state.lock();
            (state.chart_data.is_some(), state.initialized)
        };
        if initialized {
            return false;
        }
        let has_container = self
            .deps
            .dom
            .find_element(&self.settings.container_id)
            .is_some();
        log::debug!(
            "ChartController - periodic check {attempt}/{max_attempts}: data={has_data} container={has_container}"
        );

        // Whatever the outcome, recovery from here on belongs to the retry path.
        if has_data && has_container {
            log::info!("ChartController - conditions met on periodic check, initializing");
            let outcome = Inner::run_cycle(Arc::clone(self)).await;
            log::debug!("ChartController - periodic check stops after {outcome:?}");
            return false;
        }

        if attempt >= max_attempts {
            log::warn!("ChartController - periodic check limit reached");
            if self.budget.can_retry() {
                Inner::force_reload(Arc::clone(self)).await;
            }
            return false;
        }

        let every = self.settings.periodic_reload_every.max(1);
        if attempt % every == 0 && !has_data && self.budget.can_retry() {
            Inner::force_reload(Arc::clone(self)).await;
        }
        true
    }

    /// Abort the periodic check and any pending retry.
    fn cancel_background(&self) {
        let mut timers = self.timers.lock();
        if let Some(task) = timers.periodic.take() {
            task.abort();
        }
        if let Some(task) = timers.retry.take() {
            task.abort();
        }
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) -> Option<JoinHandle<()>> {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(task)),
            Err(_) => {
                log::warn!("ChartController - no async runtime, background task dropped");
                None
            }
        }
    }
}
