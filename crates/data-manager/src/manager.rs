//! Dashboard data service
//!
//! Wraps a [`DashboardSource`] with the store bookkeeping that every load
//! needs: the `dashboard` loading flag, query defaults from the `initial`
//! slice, writing the decoded bundle to `chart` and recording failures.

use crate::fetcher::{DashboardQuery, DashboardSource};
use crate::parser::ChartDataValidator;
use datamaq_shared::{ApiResponse, ChartDataBundle, PeriodName, Timestamp};
use datamaq_store::StateStore;
use std::sync::Arc;

/// Error source recorded in the store for failed loads.
pub const API_ERROR_SOURCE: &str = "apiService";
const LOADING_COMPONENT: &str = "dashboard";

pub struct DashboardService {
    store: Arc<StateStore>,
    source: Arc<dyn DashboardSource>,
    validator: ChartDataValidator,
}

impl DashboardService {
    pub fn new(store: Arc<StateStore>, source: Arc<dyn DashboardSource>) -> Self {
        Self {
            store,
            source,
            validator: ChartDataValidator::new(),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Fetch the dashboard bundle for `periodo`/`conta`.
    ///
    /// Missing arguments are taken from the `initial` slice. Every failure
    /// (transport, backend or shape) comes back as `ApiResponse::Error` and
    /// is recorded under `apiService`; the loading flag is cleared on every
    /// path.
    pub async fn get_dashboard_data(
        &self,
        periodo: Option<PeriodName>,
        conta: Option<Timestamp>,
    ) -> ApiResponse<ChartDataBundle> {
        self.store.set_loading(LOADING_COMPONENT, true);
        let query = self.query(periodo, conta);
        log::info!(
            "DashboardService - loading dashboard data: periodo={} conta={:?}",
            query.periodo,
            query.conta.map(|c| c.as_secs())
        );

        let response = self.load(&query).await;
        if let ApiResponse::Error { message } = &response {
            self.store.add_error(API_ERROR_SOURCE, message);
        }

        self.store.set_loading(LOADING_COMPONENT, false);
        response
    }

    async fn load(&self, query: &DashboardQuery) -> ApiResponse<ChartDataBundle> {
        let payload = match self.source.fetch_dashboard(query).await {
            Ok(ApiResponse::Success { data }) => data,
            Ok(ApiResponse::Error { message }) => {
                let message = if message.is_empty() {
                    "unexpected response".to_string()
                } else {
                    message
                };
                log::warn!("DashboardService - backend error: {message}");
                return ApiResponse::error(format!("Error in response: {message}"));
            }
            Err(e) => {
                log::error!("DashboardService - request failed: {e}");
                return ApiResponse::error(e.to_string());
            }
        };

        match self.validator.decode(payload) {
            Ok(bundle) => {
                self.store.set_chart_data(&bundle);
                log::debug!(
                    "DashboardService - stored chart data: {} samples",
                    bundle.rawdata.len()
                );
                ApiResponse::Success { data: bundle }
            }
            Err(e) => {
                log::error!("DashboardService - rejected payload: {e}");
                ApiResponse::error(e.to_string())
            }
        }
    }

    fn query(&self, periodo: Option<PeriodName>, conta: Option<Timestamp>) -> DashboardQuery {
        let initial = self.store.initial_data().unwrap_or_default();
        DashboardQuery::new(periodo.unwrap_or(initial.periodo), conta.or(initial.conta))
    }
}
