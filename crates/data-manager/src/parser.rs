//! Structural validation of chart bundles

use datamaq_shared::{ChartDataBundle, DashboardError, REQUIRED_CHART_FIELDS};
use serde_json::Value;
use thiserror::Error;

/// Why a candidate bundle was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("chart data is missing")]
    Missing,

    #[error("chart data is not an object")]
    NotAnObject,

    #[error("chart data lacks required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("rawdata is not an array")]
    RawDataNotArray,

    #[error("rawdata is empty")]
    EmptyRawData,
}

impl From<ValidationIssue> for DashboardError {
    fn from(issue: ValidationIssue) -> Self {
        DashboardError::InvalidChartData {
            reason: issue.to_string(),
        }
    }
}

/// Pure predicate over candidate chart bundles
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartDataValidator;

impl ChartDataValidator {
    pub fn new() -> Self {
        Self
    }

    /// True when the bundle can be rendered. Rejections are logged.
    pub fn validate(&self, chart_data: &Value) -> bool {
        match self.check(chart_data) {
            Ok(()) => {
                log::debug!(
                    "ChartDataValidator - chart data valid: {} samples, periodo {}",
                    chart_data["rawdata"].as_array().map_or(0, Vec::len),
                    chart_data["periodo"]
                );
                true
            }
            Err(issue) => {
                log::error!("ChartDataValidator - {issue}");
                false
            }
        }
    }

    /// Full check: required fields present and `rawdata` a non-empty array.
    pub fn check(&self, chart_data: &Value) -> Result<(), ValidationIssue> {
        self.check_structure(chart_data)?;
        match chart_data["rawdata"].as_array() {
            Some(samples) if samples.is_empty() => Err(ValidationIssue::EmptyRawData),
            _ => Ok(()),
        }
    }

    /// Shape check used at the remote boundary; an empty `rawdata` passes.
    pub fn check_structure(&self, chart_data: &Value) -> Result<(), ValidationIssue> {
        let fields = match chart_data {
            Value::Null => return Err(ValidationIssue::Missing),
            Value::Object(fields) => fields,
            _ => return Err(ValidationIssue::NotAnObject),
        };

        let missing: Vec<&'static str> = REQUIRED_CHART_FIELDS
            .iter()
            .copied()
            .filter(|field| !fields.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationIssue::MissingFields(missing));
        }

        if !fields["rawdata"].is_array() {
            return Err(ValidationIssue::RawDataNotArray);
        }
        Ok(())
    }

    /// Validate an already decoded bundle; only `rawdata` can still be wrong.
    pub fn validate_bundle(&self, bundle: Option<&ChartDataBundle>) -> bool {
        match bundle {
            None => {
                log::error!("ChartDataValidator - {}", ValidationIssue::Missing);
                false
            }
            Some(bundle) if bundle.rawdata.is_empty() => {
                log::error!("ChartDataValidator - {}", ValidationIssue::EmptyRawData);
                false
            }
            Some(_) => true,
        }
    }

    /// Check the shape of a raw payload and decode it.
    pub fn decode(&self, chart_data: Value) -> Result<ChartDataBundle, DashboardError> {
        self.check_structure(&chart_data)?;
        ChartDataBundle::from_value(chart_data)
    }
}
