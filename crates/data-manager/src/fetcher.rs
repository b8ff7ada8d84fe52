//! Remote data call: `GET <base>/<dashboard>?periodo=..&conta=..`

use crate::{FetchError, Result};
use datamaq_shared::{ApiConfigResponse, ApiResponse, PeriodName, Timestamp};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_DASHBOARD_PATH: &str = "dashboard.php";

/// Parameters of one dashboard request
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardQuery {
    pub periodo: PeriodName,
    pub conta: Option<Timestamp>,
}

impl DashboardQuery {
    pub fn new(periodo: PeriodName, conta: Option<Timestamp>) -> Self {
        Self { periodo, conta }
    }

    /// Build the request URL relative to `base`.
    pub fn to_url(&self, base: &str, path: &str) -> Result<Url> {
        // A base without a trailing slash would drop its last segment on join.
        let base = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        let mut url = base.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("periodo", self.periodo.as_str());
            if let Some(conta) = self.conta {
                query.append_pair("conta", &conta.to_string());
            }
        }
        Ok(url)
    }
}

/// Anything that can answer a dashboard query with the backend envelope.
///
/// Transport failures are `Err`; backend-reported failures arrive as
/// `ApiResponse::Error`.
pub trait DashboardSource: Send + Sync {
    fn fetch_dashboard<'a>(
        &'a self,
        query: &'a DashboardQuery,
    ) -> BoxFuture<'a, Result<ApiResponse<Value>>>;
}

/// `reqwest`-backed client for the PHP backend
pub struct HttpDashboardClient {
    http: reqwest::Client,
    base_url: RwLock<String>,
    dashboard_path: String,
}

impl HttpDashboardClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: RwLock::new(base_url.into()),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
        })
    }

    pub fn with_dashboard_path(mut self, path: impl Into<String>) -> Self {
        self.dashboard_path = path.into();
        self
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    /// Ask the configuration endpoint for the current backend base URL.
    ///
    /// On success the client switches to it; on failure the previous base
    /// URL stays in place.
    pub async fn discover_base_url(&self, config_url: &str) -> Result<String> {
        let body = self.get_json(Url::parse(config_url)?).await?;
        let config: ApiConfigResponse = serde_json::from_value(body)?;

        if config.status != "success" {
            log::warn!(
                "HttpDashboardClient - config endpoint reported '{}': {}",
                config.status,
                config.error.as_deref().unwrap_or("no details")
            );
        }
        let base_url = config
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| FetchError::Api("BASE_URL missing from configuration".to_string()))?;

        log::info!("HttpDashboardClient - base URL set to {base_url}");
        *self.base_url.write() = base_url.clone();
        Ok(base_url)
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        log::debug!("HttpDashboardClient - GET {url}");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl DashboardSource for HttpDashboardClient {
    fn fetch_dashboard<'a>(
        &'a self,
        query: &'a DashboardQuery,
    ) -> BoxFuture<'a, Result<ApiResponse<Value>>> {
        Box::pin(async move {
            let url = query.to_url(&self.base_url(), &self.dashboard_path)?;
            let body = self.get_json(url).await?;
            Ok(serde_json::from_value(body)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url() {
        let query = DashboardQuery::new(PeriodName::from("turno"), None);
        let url = query
            .to_url("http://localhost/DataMaq/backend/api", DEFAULT_DASHBOARD_PATH)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost/DataMaq/backend/api/dashboard.php?periodo=turno"
        );
    }

    #[test]
    fn test_query_url_with_conta() {
        let query = DashboardQuery::new(
            PeriodName::from("hora"),
            Timestamp::parse("1700000000,5"),
        );
        let url = query
            .to_url("https://tunnel.example/api/", DEFAULT_DASHBOARD_PATH)
            .unwrap();
        assert_eq!(url.query(), Some("periodo=hora&conta=1700000000.5"));
    }

    #[test]
    fn test_invalid_base_url() {
        let query = DashboardQuery::new(PeriodName::default(), None);
        assert!(matches!(
            query.to_url("not a url", DEFAULT_DASHBOARD_PATH),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
