//! Chart lifecycle integration for the DataMaq dashboard
//!
//! Ties the state store, the event bus and the data service to the page
//! collaborators (DOM host, charting library, navigation) and decides when
//! and with what data the chart is (re)initialized.

pub mod app;
pub mod click;
pub mod controller;
pub mod dom;
pub mod error_recovery;
pub mod lifecycle;
pub mod navigation;
pub mod readiness;
pub mod render;

use datamaq_config::ConfigError;
use datamaq_data::FetchError;
use datamaq_shared::DashboardError;
use thiserror::Error;

pub use app::{parse_query, DashboardApp};
pub use click::{ClickDisambiguator, ClickState};
pub use controller::{ChartLifecycleController, ControllerDeps, ControllerStatus, InitOutcome};
pub use dom::{DomHost, MemoryDom, MountNode};
pub use error_recovery::{FailureBudget, FailureKind, RecoveryAction, RecoveryStats};
pub use lifecycle::{ChartPhase, PhaseStats, PhaseTracker};
pub use navigation::{Navigator, ZoomTarget};
pub use readiness::{wait_until, WaitTimeout};
pub use render::{ChartCallbacks, ChartHandle, ChartOptions, ChartRenderer, RenderConfig};

/// System integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Chart data unavailable: {0}")]
    MissingData(String),

    #[error("Data load failed: {0}")]
    DataLoad(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Charting library unavailable")]
    LibraryUnavailable,

    #[error("Render error: {0}")]
    Render(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Shared error: {0}")]
    Shared(#[from] DashboardError),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
