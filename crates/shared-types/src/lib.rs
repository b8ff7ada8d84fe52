//! Shared types for the DataMaq dashboard
//!
//! This crate contains the typed records exchanged between the state store,
//! the data manager and the chart lifecycle controller. Loose JSON payloads
//! coming from the backend are decoded into these records at the boundary.

pub mod api;
pub mod data_types;
pub mod errors;
pub mod events;
pub mod store_state;

pub use api::{ApiConfigResponse, ApiResponse};
pub use data_types::{ChartDataBundle, DataPoint, PeriodName, Timestamp, REQUIRED_CHART_FIELDS};
pub use errors::{DashboardError, DashboardResult};
pub use store_state::{ErrorId, ErrorRecord, InitialData, LoadingFlags, StateKey};

/// Milliseconds since the Unix epoch, as used in event payloads.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
