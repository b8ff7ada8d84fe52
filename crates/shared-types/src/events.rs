//! Event bus contract: names and payloads of the signals exchanged between
//! the page shell, the state store bridge and the chart controller.

use crate::data_types::ChartDataBundle;
use serde::{Deserialize, Serialize};

/// The page shell is ready.
pub const APP_DOM_READY: &str = "appDomReady";
/// The chart bundle changed; carries [`ChartDataUpdated`].
pub const CHART_DATA_UPDATED: &str = "chartDataUpdated";
/// The chart mount point is in the DOM; carries [`ContainerReady`].
pub const CONTAINER_READY: &str = "containerReady";
/// The charting library reported its load event; carries [`ChartReady`].
pub const CHART_READY: &str = "chartReady";
/// A single click selected a point; carries [`ChartPointSelected`].
pub const CHART_POINT_SELECTED: &str = "chartPointSelected";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDomReady {
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataUpdated {
    #[serde(rename = "chartData", default)]
    pub chart_data: Option<ChartDataBundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerReady {
    #[serde(rename = "containerId")]
    pub container_id: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartReady {
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPointSelected {
    pub x: f64,
}
