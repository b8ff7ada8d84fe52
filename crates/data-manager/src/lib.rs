//! Data Manager crate for the DataMaq dashboard
//! Fetches chart bundles from the backend, validates them at the boundary and
//! turns them into renderable series.

pub mod fetcher;
pub mod manager;
pub mod parser;
pub mod series;

use thiserror::Error;

pub use fetcher::{DashboardQuery, DashboardSource, HttpDashboardClient};
pub use manager::DashboardService;
pub use parser::{ChartDataValidator, ValidationIssue};
pub use series::{Series, SeriesBuilder, SeriesError};

/// Failures of the remote data call
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
