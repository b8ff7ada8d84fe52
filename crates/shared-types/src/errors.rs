//! Common error types used across all DataMaq crates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for dashboard operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum DashboardError {
    // Data-related errors
    #[error("Data fetch failed: {message}")]
    DataFetch { message: String },

    #[error("Data parse error: {message}")]
    DataParse { message: String },

    #[error("Invalid chart data: {reason}")]
    InvalidChartData { reason: String },

    // State management errors
    #[error("Unknown state key: {key}")]
    UnknownStateKey { key: String },

    // DOM/rendering errors
    #[error("Container '{id}' unavailable")]
    ContainerUnavailable { id: String },

    #[error("Charting library unavailable")]
    LibraryUnavailable,

    #[error("Render failed: {message}")]
    Render { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for dashboard operations
pub type DashboardResult<T> = Result<T, DashboardError>;

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::DataParse {
            message: err.to_string(),
        }
    }
}
