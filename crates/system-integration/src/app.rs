//! Composition root of the dashboard page

use crate::controller::{ChartLifecycleController, ControllerDeps, InitOutcome};
use crate::dom::DomHost;
use crate::navigation::Navigator;
use crate::render::ChartRenderer;
use anyhow::{anyhow, Context};
use datamaq_config::{ConfigValidator, DashboardConfig};
use datamaq_data::{DashboardService, DashboardSource, HttpDashboardClient};
use datamaq_shared::events::{AppDomReady, APP_DOM_READY, CHART_DATA_UPDATED};
use datamaq_shared::{now_millis, ApiResponse, InitialData, PeriodName, Timestamp};
use datamaq_store::{EventBus, StateStore, Subscription};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

/// Error source for period changes
pub const DASHBOARD_ERROR_SOURCE: &str = "dashboard";

/// Page context from a query string such as `?periodo=turno&conta=1700000000,5`.
///
/// `conta` accepts a decimal comma; an unparsable `conta` is dropped.
pub fn parse_query(query: &str, default_periodo: PeriodName) -> InitialData {
    let mut initial = InitialData {
        periodo: default_periodo,
        ..Default::default()
    };

    for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "periodo" if !value.is_empty() => initial.periodo = PeriodName::new(value),
            "conta" if !value.is_empty() => {
                initial.conta = Timestamp::parse(&value);
                if initial.conta.is_none() {
                    log::warn!("DashboardApp - ignoring invalid conta '{value}'");
                }
            }
            _ => {}
        }
    }
    log::debug!(
        "DashboardApp - query parameters: periodo={} conta={:?}",
        initial.periodo,
        initial.conta.map(|c| c.as_secs())
    );
    initial
}

/// Wires the store, the bus, the data service and the chart controller
pub struct DashboardApp {
    config: DashboardConfig,
    store: Arc<StateStore>,
    bus: Arc<EventBus>,
    service: Arc<DashboardService>,
    controller: ChartLifecycleController,
    bridge: Mutex<Option<Subscription>>,
}

impl DashboardApp {
    pub fn new(
        config: DashboardConfig,
        source: Arc<dyn DashboardSource>,
        dom: Arc<dyn DomHost>,
        renderer: Arc<dyn ChartRenderer>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let store = Arc::new(StateStore::new());
        let bus = Arc::new(EventBus::new());
        let service = Arc::new(DashboardService::new(Arc::clone(&store), source));

        let controller = ChartLifecycleController::new(
            config.chart.clone(),
            ControllerDeps {
                store: Arc::clone(&store),
                bus: Arc::clone(&bus),
                service: Arc::clone(&service),
                dom,
                renderer,
                navigator,
            },
        );

        // Every change of the chart slice is republished on the bus.
        let bridge = {
            let bus = Arc::downgrade(&bus);
            store.subscribe("chart", move |chart| {
                if let Some(bus) = bus.upgrade() {
                    bus.emit(CHART_DATA_UPDATED, &json!({ "chartData": chart }));
                }
            })
        };

        Self {
            config,
            store,
            bus,
            service,
            controller,
            bridge: Mutex::new(Some(bridge)),
        }
    }

    /// Build the app against the HTTP backend, asking the configuration
    /// endpoint for the current base URL first.
    pub async fn bootstrap(
        config: DashboardConfig,
        dom: Arc<dyn DomHost>,
        renderer: Arc<dyn ChartRenderer>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        ConfigValidator::validate(&config).context("invalid dashboard configuration")?;

        let client = HttpDashboardClient::new(
            config.api.base_url.clone(),
            config.api.request_timeout(),
        )
        .context("failed to build the HTTP client")?
        .with_dashboard_path(config.api.dashboard_path.clone());

        if let Err(e) = client.discover_base_url(&config.api.config_url()).await {
            log::warn!(
                "DashboardApp - base URL discovery failed, keeping {}: {e}",
                client.base_url()
            );
        }

        Ok(Self::new(config, Arc::new(client), dom, renderer, navigator))
    }

    /// Load the bundle for `query`, hand it to the controller and announce
    /// that the page is ready.
    pub async fn start(&self, query: &str) -> anyhow::Result<()> {
        let initial = parse_query(query, PeriodName::new(self.config.defaults.periodo.as_str()));
        self.store.set_initial_data(&initial);

        let bundle = self
            .service
            .get_dashboard_data(Some(initial.periodo.clone()), initial.conta)
            .await
            .into_result()
            .map_err(|message| anyhow!(message))
            .context("failed to load dashboard data")?;

        let initial = InitialData {
            periodo: bundle.periodo.clone(),
            conta: bundle.conta,
            csrf_token: initial.csrf_token,
        };
        self.store.set_initial_data(&initial);
        self.controller.init(Some(initial), Some(bundle));

        self.bus.emit_event(
            APP_DOM_READY,
            &AppDomReady {
                timestamp: now_millis(),
            },
        );
        log::info!("DashboardApp - started");
        Ok(())
    }

    /// Switch the dashboard to `periodo`. Returns `false` when the period is
    /// already shown or the load failed.
    pub async fn change_periodo(&self, periodo: PeriodName) -> bool {
        let current = self.store.chart_data().map(|chart| chart.periodo);
        if current.as_ref() == Some(&periodo) {
            log::debug!("DashboardApp - periodo '{periodo}' already shown");
            return false;
        }

        match self.service.get_dashboard_data(Some(periodo), None).await {
            ApiResponse::Success { data } => {
                let initial = InitialData {
                    periodo: data.periodo.clone(),
                    conta: data.conta,
                    csrf_token: self.store.initial_data().and_then(|i| i.csrf_token),
                };
                self.store.set_initial_data(&initial);
                self.controller.init(Some(initial), Some(data));
                let outcome = self.controller.init_chart().await;
                log::info!("DashboardApp - periodo changed: {outcome:?}");
                true
            }
            ApiResponse::Error { message } => {
                self.store.add_error(DASHBOARD_ERROR_SOURCE, &message);
                log::error!("DashboardApp - periodo change failed: {message}");
                false
            }
        }
    }

    /// Run one initialization cycle outside the event flow.
    pub async fn refresh_chart(&self) -> InitOutcome {
        self.controller.init_chart().await
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn service(&self) -> &Arc<DashboardService> {
        &self.service
    }

    pub fn controller(&self) -> &ChartLifecycleController {
        &self.controller
    }

    pub fn shutdown(&self) {
        self.controller.shutdown();
        if let Some(bridge) = self.bridge.lock().take() {
            bridge.unsubscribe();
        }
    }
}
