//! Integration tests for the chart lifecycle

use datamaq_config::{ChartSettings, DashboardConfig};
use datamaq_data::{DashboardQuery, DashboardService, DashboardSource};
use datamaq_integration::{
    ChartCallbacks, ChartHandle, ChartLifecycleController, ChartOptions, ChartPhase,
    ChartRenderer, ControllerDeps, DashboardApp, DomHost, FailureKind, InitOutcome,
    IntegrationError, MemoryDom, MountNode, Navigator, RenderConfig,
};
use datamaq_shared::events::{CHART_POINT_SELECTED, CHART_READY};
use datamaq_shared::{ApiResponse, ChartDataBundle, InitialData, PeriodName};
use datamaq_store::{EventBus, StateStore};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PARENT: &str = "info-display-container";
const CONTAINER: &str = "container";

fn payload(periodo: &str) -> Value {
    json!({
        "conta": 1700000000,
        "rawdata": [
            {"unixtime": 1699999700, "HR_COUNTER1": 0, "HR_COUNTER2": 0},
            {"unixtime": 1700000000, "HR_COUNTER1": 50, "HR_COUNTER2": 25}
        ],
        "ls_periodos": {"semana": 604800, "turno": 28800, "hora": 3600},
        "menos_periodo": {"semana": "turno", "turno": "hora", "hora": "hora"},
        "periodo": periodo
    })
}

fn bundle(periodo: &str) -> ChartDataBundle {
    ChartDataBundle::from_value(payload(periodo)).unwrap()
}

/// Backend that echoes the requested period, or fails while `failing` is set.
#[derive(Default)]
struct EchoSource {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl DashboardSource for EchoSource {
    fn fetch_dashboard<'a>(
        &'a self,
        query: &'a DashboardQuery,
    ) -> BoxFuture<'a, datamaq_data::Result<ApiResponse<Value>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = if self.failing.load(Ordering::SeqCst) {
            ApiResponse::error("backend down")
        } else {
            ApiResponse::Success {
                data: payload(query.periodo.as_str()),
            }
        };
        Box::pin(async move { Ok(response) })
    }
}

#[derive(Default)]
struct FakeRenderer {
    unavailable: AtomicBool,
    fail_primary: AtomicBool,
    fail_all: AtomicBool,
    attempts: AtomicUsize,
    next_handle: AtomicU64,
    rendered: Mutex<Vec<ChartOptions>>,
    destroyed: Mutex<Vec<ChartHandle>>,
    callbacks: Mutex<Option<ChartCallbacks>>,
}

impl FakeRenderer {
    fn click(&self, x: f64) {
        let callbacks = self.callbacks.lock().clone().unwrap();
        (callbacks.on_click)(x);
    }
}

impl ChartRenderer for FakeRenderer {
    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    fn render(&self, _node: &MountNode, config: RenderConfig) -> datamaq_integration::Result<ChartHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst)
            || (self.fail_primary.load(Ordering::SeqCst) && config.options.chart_type == "spline")
        {
            return Err(IntegrationError::Render("library threw".to_string()));
        }

        self.rendered.lock().push(config.options.clone());
        *self.callbacks.lock() = Some(config.callbacks.clone());
        (config.callbacks.on_load)();
        Ok(ChartHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn destroy(&self, handle: ChartHandle) {
        self.destroyed.lock().push(handle);
    }
}

#[derive(Default)]
struct FakeNavigator {
    queries: Mutex<Vec<String>>,
}

impl Navigator for FakeNavigator {
    fn navigate(&self, query: &str) {
        self.queries.lock().push(query.to_string());
    }
}

struct Harness {
    store: Arc<StateStore>,
    bus: Arc<EventBus>,
    source: Arc<EchoSource>,
    dom: Arc<MemoryDom>,
    renderer: Arc<FakeRenderer>,
    navigator: Arc<FakeNavigator>,
    controller: ChartLifecycleController,
}

fn harness(dom: MemoryDom) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = Arc::new(StateStore::new());
    let bus = Arc::new(EventBus::new());
    let source = Arc::new(EchoSource::default());
    let dom = Arc::new(dom);
    let renderer = Arc::new(FakeRenderer::default());
    let navigator = Arc::new(FakeNavigator::default());
    let service = Arc::new(DashboardService::new(store.clone(), source.clone()));

    let controller = ChartLifecycleController::new(
        ChartSettings::default(),
        ControllerDeps {
            store: store.clone(),
            bus: bus.clone(),
            service,
            dom: dom.clone(),
            renderer: renderer.clone(),
            navigator: navigator.clone(),
        },
    );
    controller.set_initial_data(InitialData::default());

    Harness {
        store,
        bus,
        source,
        dom,
        renderer,
        navigator,
        controller,
    }
}

fn page() -> MemoryDom {
    let dom = MemoryDom::with_elements([PARENT]);
    dom.create_element(PARENT, CONTAINER, "graf");
    dom
}

fn record_events(bus: &EventBus, name: &str) -> Arc<Mutex<Vec<Value>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    // The registration lives as long as the bus.
    let _ = bus.subscribe(name, move |payload| sink.lock().push(payload.clone()));
    events
}

#[tokio::test(start_paused = true)]
async fn test_failure_budget_stops_retries_until_new_data() {
    let h = harness(page());
    h.source.failing.store(true, Ordering::SeqCst);

    // Missing data, then four failed reloads: five failures in total.
    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::MissingData)
    );
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(h.source.calls.load(Ordering::SeqCst), 4);
    assert_eq!(h.controller.failed_attempts(), 5);
    assert_eq!(h.controller.phase(), ChartPhase::Exhausted);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 4);
    assert!(h.renderer.rendered.lock().is_empty());

    h.controller.set_chart_data(Some(bundle("semana")));
    assert_eq!(h.controller.init_chart().await, InitOutcome::Rendered);
    assert_eq!(h.controller.failed_attempts(), 0);
    assert_eq!(h.controller.phase(), ChartPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_missing_data_recovers_on_reload() {
    let h = harness(page());

    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::MissingData)
    );
    assert_eq!(h.controller.phase(), ChartPhase::ErrorBackoff);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    assert!(h.controller.is_initialized());
    assert_eq!(h.controller.failed_attempts(), 0);
    assert_eq!(h.renderer.rendered.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_container_created_under_parent() {
    let h = harness(MemoryDom::with_elements([PARENT]));
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(h.controller.init_chart().await, InitOutcome::Rendered);
    assert_eq!(h.dom.parent_of(CONTAINER).as_deref(), Some(PARENT));
    assert_eq!(h.dom.class_of(CONTAINER).as_deref(), Some("graf"));
    assert_eq!(
        h.controller.phase_history(),
        vec![
            ChartPhase::Idle,
            ChartPhase::AwaitingData,
            ChartPhase::AwaitingContainer,
            ChartPhase::Validating,
            ChartPhase::Rendering,
            ChartPhase::Ready,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_data_arriving_mid_cycle_is_rendered_next() {
    let h = harness(MemoryDom::with_elements([PARENT]));
    h.controller.init(None, Some(bundle("semana")));
    let first = tokio::spawn(h.controller.init_chart());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.controller.phase().is_active());
    assert_eq!(h.controller.init_chart().await, InitOutcome::InProgress);

    let mut newer = payload("semana");
    newer["rawdata"][1]["HR_COUNTER1"] = json!(500);
    h.bus.emit(
        datamaq_shared::events::CHART_DATA_UPDATED,
        &json!({ "chartData": newer }),
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.dom.insert(CONTAINER);

    assert_eq!(first.await.unwrap(), InitOutcome::Rendered);
    tokio::time::sleep(Duration::from_secs(20)).await;

    let rendered = h.renderer.rendered.lock();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].series[0].data.last(), Some(&[1_700_000_000_000.0, 10.0]));
    assert_eq!(rendered[1].series[0].data.last(), Some(&[1_700_000_000_000.0, 100.0]));
    drop(rendered);
    assert_eq!(h.controller.init_chart().await, InitOutcome::AlreadyInitialized);
    assert!(!h.controller.phase().is_active());
}

#[tokio::test(start_paused = true)]
async fn test_container_appearing_while_waiting() {
    let h = harness(MemoryDom::with_elements([PARENT]));
    h.controller.set_chart_data(Some(bundle("semana")));

    let dom = h.dom.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        dom.insert(CONTAINER);
    });

    assert_eq!(h.controller.init_chart().await, InitOutcome::Rendered);
    // Found, not synthesized.
    assert!(h.dom.parent_of(CONTAINER).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_parent_retries_with_cached_data() {
    let h = harness(MemoryDom::new());
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::Container)
    );
    let errors = h.store.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source, "chartController");

    // The retry waits out the container window again before creating it.
    h.dom.insert(PARENT);
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(h.controller.is_initialized());
    // DOM failures never re-fetch.
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_library_unavailable_counts_as_failure() {
    let h = harness(page());
    h.renderer.unavailable.store(true, Ordering::SeqCst);
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::Library)
    );
    assert_eq!(h.controller.failed_attempts(), 1);

    h.renderer.unavailable.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(h.controller.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn test_empty_rawdata_is_rejected() {
    let h = harness(page());
    h.source.failing.store(true, Ordering::SeqCst);
    let mut empty = bundle("semana");
    empty.rawdata.clear();
    h.controller.set_chart_data(Some(empty));

    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::Validation)
    );
    assert!(h.renderer.rendered.lock().is_empty());
    assert!(!h.controller.status().data_received);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_render() {
    let h = harness(page());
    h.renderer.fail_primary.store(true, Ordering::SeqCst);
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(h.controller.init_chart().await, InitOutcome::RenderedFallback);
    let rendered = h.renderer.rendered.lock();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].title, "Fallback chart");
    assert!(h.controller.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn test_inline_error_when_every_render_fails() {
    let h = harness(page());
    h.renderer.fail_all.store(true, Ordering::SeqCst);
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::Render)
    );
    assert!(h.dom.inner_html(CONTAINER).unwrap().contains("chart-error"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.controller.phase(), ChartPhase::Exhausted);
    assert_eq!(h.controller.failed_attempts(), 5);
    // Primary and fallback per cycle.
    assert_eq!(h.renderer.attempts.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_init_is_idempotent_until_data_changes() {
    let h = harness(page());
    h.controller.set_chart_data(Some(bundle("semana")));

    assert_eq!(h.controller.init_chart().await, InitOutcome::Rendered);
    assert_eq!(h.controller.init_chart().await, InitOutcome::AlreadyInitialized);
    h.controller.set_chart_data(Some(bundle("semana")));
    assert_eq!(h.controller.init_chart().await, InitOutcome::AlreadyInitialized);
    assert_eq!(h.renderer.rendered.lock().len(), 1);

    h.controller.set_chart_data(Some(bundle("turno")));
    assert_eq!(h.controller.init_chart().await, InitOutcome::Rendered);
    assert_eq!(h.renderer.rendered.lock().len(), 2);
    assert_eq!(h.renderer.destroyed.lock().as_slice(), &[ChartHandle(0)]);
}

#[tokio::test(start_paused = true)]
async fn test_load_callback_emits_chart_ready() {
    let h = harness(page());
    let ready = record_events(&h.bus, CHART_READY);
    h.controller.set_chart_data(Some(bundle("semana")));

    h.controller.init_chart().await;
    let ready = ready.lock();
    assert_eq!(ready.len(), 1);
    assert!(ready[0]["timestamp"].as_u64().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_double_click_navigates_to_drill_period() {
    let h = harness(page());
    h.controller.set_chart_data(Some(bundle("semana")));
    h.controller.init_chart().await;

    h.renderer.click(1_700_000_000_000.0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.renderer.click(1_700_000_000_000.0);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.navigator.queries.lock().as_slice(),
        &["?periodo=turno&conta=1700000014400".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_clicks_select_points() {
    let h = harness(page());
    let selected = record_events(&h.bus, CHART_POINT_SELECTED);
    h.controller.set_chart_data(Some(bundle("semana")));
    h.controller.init_chart().await;

    h.controller.handle_chart_click(1000.0);
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.controller.handle_chart_click(1000.0);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        selected.lock().as_slice(),
        &[json!({"x": 1000.0}), json!({"x": 1000.0})]
    );
    assert!(h.navigator.queries.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_check_reloads_missing_data() {
    let h = harness(page());
    h.controller.init(Some(InitialData::default()), None);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    assert!(h.controller.is_initialized());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.renderer.rendered.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_check_hands_over_to_retries() {
    let h = harness(page());
    h.renderer.unavailable.store(true, Ordering::SeqCst);
    h.controller.init(Some(InitialData::default()), Some(bundle("semana")));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.controller.failed_attempts(), 1);
    assert_eq!(h.controller.phase(), ChartPhase::ErrorBackoff);

    // Only the retries charge the budget after the first periodic cycle.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.controller.failed_attempts(), 5);
    assert_eq!(h.controller.status().recovery.failures, 5);
    assert_eq!(h.controller.phase(), ChartPhase::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_chart_data_event_triggers_render() {
    let h = harness(page());
    h.controller.init(Some(InitialData::default()), None);

    h.bus.emit(
        datamaq_shared::events::CHART_DATA_UPDATED,
        &json!({ "chartData": payload("semana") }),
    );
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(h.controller.is_initialized());
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_background_work() {
    let h = harness(MemoryDom::new());
    h.controller.init(None, Some(bundle("semana")));
    assert_eq!(
        h.controller.init_chart().await,
        InitOutcome::Failed(FailureKind::Container)
    );

    h.controller.shutdown();
    h.dom.insert(CONTAINER);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(!h.controller.is_initialized());
    assert_eq!(h.controller.phase(), ChartPhase::Idle);
    assert_eq!(h.controller.init_chart().await, InitOutcome::Stopped);
}

fn app(source: Arc<EchoSource>) -> (DashboardApp, Arc<FakeRenderer>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let renderer = Arc::new(FakeRenderer::default());
    let app = DashboardApp::new(
        DashboardConfig::default(),
        source,
        Arc::new(page()),
        renderer.clone(),
        Arc::new(FakeNavigator::default()),
    );
    (app, renderer)
}

#[tokio::test(start_paused = true)]
async fn test_app_start_and_change_periodo() {
    let source = Arc::new(EchoSource::default());
    let (app, renderer) = app(source.clone());

    app.start("?periodo=semana&conta=1700000000,5").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(app.controller().is_initialized());
    assert_eq!(renderer.rendered.lock().len(), 1);

    assert!(!app.change_periodo(PeriodName::from("semana")).await);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    assert!(app.change_periodo(PeriodName::from("turno")).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(renderer.rendered.lock().len(), 2);
    assert_eq!(
        app.store().initial_data().unwrap().periodo,
        PeriodName::from("turno")
    );
    assert_eq!(
        app.controller().chart_data().unwrap().periodo,
        PeriodName::from("turno")
    );

    app.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_app_bridge_republishes_chart_slice() {
    let (app, _renderer) = app(Arc::new(EchoSource::default()));
    let updates = record_events(app.bus(), datamaq_shared::events::CHART_DATA_UPDATED);

    app.store().set_chart_data(&payload("hora"));
    let updates = updates.lock();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["chartData"]["periodo"], json!("hora"));
}

#[tokio::test(start_paused = true)]
async fn test_app_start_failure_is_reported() {
    let source = Arc::new(EchoSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let (app, renderer) = app(source);

    let err = app.start("").await.unwrap_err();
    assert!(format!("{err:#}").contains("backend down"));
    assert!(app.store().errors().iter().any(|e| e.source == "apiService"));
    assert!(renderer.rendered.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_change_periodo_failure_records_dashboard_error() {
    let source = Arc::new(EchoSource::default());
    let (app, _renderer) = app(source.clone());
    app.start("").await.unwrap();

    source.failing.store(true, Ordering::SeqCst);
    assert!(!app.change_periodo(PeriodName::from("hora")).await);
    assert!(app.store().errors().iter().any(|e| e.source == "dashboard"));
    app.shutdown();
}
