//! Slice shapes held by the central state store

use crate::data_types::{PeriodName, Timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named top-level region of the state store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKey {
    Chart,
    Initial,
    Loading,
    Errors,
}

impl StateKey {
    /// All slices, in notification order for a full reset.
    pub const ALL: [StateKey; 4] = [
        StateKey::Chart,
        StateKey::Initial,
        StateKey::Loading,
        StateKey::Errors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Chart => "chart",
            StateKey::Initial => "initial",
            StateKey::Loading => "loading",
            StateKey::Errors => "errors",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = crate::DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chart" => Ok(StateKey::Chart),
            "initial" => Ok(StateKey::Initial),
            "loading" => Ok(StateKey::Loading),
            "errors" => Ok(StateKey::Errors),
            other => Err(crate::DashboardError::UnknownStateKey {
                key: other.to_string(),
            }),
        }
    }
}

/// Page-load parameters (query string / server-rendered context)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialData {
    #[serde(default)]
    pub periodo: PeriodName,
    #[serde(default)]
    pub conta: Option<Timestamp>,
    #[serde(rename = "csrfToken", default)]
    pub csrf_token: Option<String>,
}

/// Loading flags for the components that fetch data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingFlags {
    pub dashboard: bool,
    pub chart: bool,
}

/// Identifier of a recorded error; strictly increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorId(pub u64);

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry of the `errors` slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: ErrorId,
    pub source: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
