//! Charting library seam and render configuration

use crate::dom::MountNode;
use crate::Result;
use chrono::{Local, TimeZone};
use datamaq_data::{Series, SeriesBuilder};
use datamaq_shared::ChartDataBundle;
use serde::Serialize;
use std::sync::Arc;

const TITLE_FORMAT: &str = "%A, %d %B %Y - %H:%M:%S";
const FALLBACK_TITLE: &str = "Fallback chart";

/// Opaque id of a live chart instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChartHandle(pub u64);

/// Callbacks the library invokes once per real load/click event
#[derive(Clone)]
pub struct ChartCallbacks {
    pub on_load: Arc<dyn Fn() + Send + Sync>,
    /// Receives the clicked x-axis value
    pub on_click: Arc<dyn Fn(f64) + Send + Sync>,
}

/// Declarative chart options handed to the library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub chart_type: String,
    pub title: String,
    pub x_axis_type: String,
    pub y_axis_title: String,
    pub legend: bool,
    pub animation: bool,
    pub series: Vec<Series>,
}

#[derive(Clone)]
pub struct RenderConfig {
    pub options: ChartOptions,
    pub callbacks: ChartCallbacks,
}

impl RenderConfig {
    /// Primary configuration for a validated bundle.
    pub fn for_bundle(
        bundle: &ChartDataBundle,
        series: Vec<Series>,
        callbacks: ChartCallbacks,
    ) -> Self {
        Self {
            options: ChartOptions {
                chart_type: "spline".to_string(),
                title: bundle.conta.map(|c| format_title(c.as_millis())).unwrap_or_default(),
                x_axis_type: "datetime".to_string(),
                y_axis_title: "[Producción]".to_string(),
                legend: true,
                animation: false,
                series,
            },
            callbacks,
        }
    }

    /// Minimal configuration tried once after the primary render fails.
    pub fn fallback(now_ms: f64, callbacks: ChartCallbacks) -> Self {
        Self {
            options: ChartOptions {
                chart_type: "line".to_string(),
                title: FALLBACK_TITLE.to_string(),
                x_axis_type: "datetime".to_string(),
                y_axis_title: String::new(),
                legend: false,
                animation: false,
                series: SeriesBuilder::fallback_series(now_ms),
            },
            callbacks,
        }
    }
}

fn format_title(millis: f64) -> String {
    match Local.timestamp_millis_opt(millis as i64).single() {
        Some(time) => time.format(TITLE_FORMAT).to_string(),
        None => String::new(),
    }
}

/// The external charting library
pub trait ChartRenderer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Draw `config` into `node`. The library may call the load callback
    /// before returning.
    fn render(&self, node: &MountNode, config: RenderConfig) -> Result<ChartHandle>;

    fn destroy(&self, handle: ChartHandle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamaq_shared::Timestamp;

    fn callbacks() -> ChartCallbacks {
        ChartCallbacks {
            on_load: Arc::new(|| {}),
            on_click: Arc::new(|_| {}),
        }
    }

    #[test]
    fn test_primary_config() {
        let bundle = ChartDataBundle {
            conta: Some(Timestamp::from_secs(1_700_000_000.0)),
            ..Default::default()
        };
        let config = RenderConfig::for_bundle(&bundle, Vec::new(), callbacks());
        assert_eq!(config.options.chart_type, "spline");
        assert!(config.options.title.contains("2023"));
        assert!(!config.options.animation);
    }

    #[test]
    fn test_fallback_config() {
        let config = RenderConfig::fallback(1000.0, callbacks());
        assert_eq!(config.options.chart_type, "line");
        assert_eq!(config.options.title, "Fallback chart");
        assert_eq!(config.options.series.len(), 1);
        assert_eq!(config.options.series[0].data, vec![[1000.0, 0.0]]);
    }
}
