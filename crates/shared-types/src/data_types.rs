//! Chart payload types returned by the dashboard endpoint

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The five fields every chart bundle must carry.
pub const REQUIRED_CHART_FIELDS: [&str; 5] =
    ["conta", "rawdata", "ls_periodos", "menos_periodo", "periodo"];

/// Aggregation window tag (`semana`, `turno`, `hora`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodName(String);

impl PeriodName {
    pub const SEMANA: &'static str = "semana";
    pub const TURNO: &'static str = "turno";
    pub const HORA: &'static str = "hora";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PeriodName {
    fn default() -> Self {
        Self::new(Self::SEMANA)
    }
}

impl fmt::Display for PeriodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Unix timestamp in seconds.
///
/// The backend and the query string both send it either as a JSON number or
/// as a numeric string, possibly with a decimal comma (`1700000000,5`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "RawTimestamp", into = "f64")]
pub struct Timestamp(f64);

impl Timestamp {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 * 1000.0
    }

    /// Parse a timestamp, accepting a decimal comma.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().replacen(',', ".", 1);
        normalized
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Timestamp> for f64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Number(f64),
    Text(String),
}

impl TryFrom<RawTimestamp> for Timestamp {
    type Error = String;

    fn try_from(raw: RawTimestamp) -> Result<Self, Self::Error> {
        match raw {
            RawTimestamp::Number(n) if n.is_finite() => Ok(Timestamp(n)),
            RawTimestamp::Number(n) => Err(format!("non-finite timestamp: {n}")),
            RawTimestamp::Text(s) => {
                Timestamp::parse(&s).ok_or_else(|| format!("invalid timestamp: {s:?}"))
            }
        }
    }
}

/// One telemetry sample from `rawdata`.
///
/// Counter fields are kept as raw JSON so that a malformed counter only
/// spoils the series that reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unixtime: Option<Timestamp>,
    #[serde(rename = "HR_COUNTER1", default, skip_serializing_if = "Option::is_none")]
    pub hr_counter1: Option<serde_json::Value>,
    #[serde(rename = "HR_COUNTER2", default, skip_serializing_if = "Option::is_none")]
    pub hr_counter2: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DataPoint {
    pub fn at(unixtime: f64) -> Self {
        Self {
            unixtime: Some(Timestamp::from_secs(unixtime)),
            ..Default::default()
        }
    }
}

/// Everything needed to render the chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataBundle {
    pub conta: Option<Timestamp>,
    pub rawdata: Vec<DataPoint>,
    /// Window length in seconds for each period
    pub ls_periodos: BTreeMap<PeriodName, f64>,
    /// Drill-down target for each period
    pub menos_periodo: BTreeMap<PeriodName, PeriodName>,
    pub periodo: PeriodName,
}

impl ChartDataBundle {
    /// Decode a bundle from a JSON value.
    pub fn from_value(value: serde_json::Value) -> crate::DashboardResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Every field serializes to a plain JSON value.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// The period a double click on this chart drills into, with its window.
    pub fn drill_down(&self) -> Option<(&PeriodName, f64)> {
        let target = self.menos_periodo.get(&self.periodo)?;
        let window = *self.ls_periodos.get(target)?;
        Some((target, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_accepts_numbers_and_strings() {
        let a: Timestamp = serde_json::from_value(json!(1700000000)).unwrap();
        let b: Timestamp = serde_json::from_value(json!("1700000000,5")).unwrap();
        assert_eq!(a.as_secs(), 1_700_000_000.0);
        assert_eq!(b.as_secs(), 1_700_000_000.5);
        assert!(serde_json::from_value::<Timestamp>(json!("soon")).is_err());
    }

    #[test]
    fn test_bundle_decodes_backend_payload() {
        let bundle = ChartDataBundle::from_value(json!({
            "conta": "1700000000",
            "rawdata": [{"unixtime": 1}, {"unixtime": 2, "HR_COUNTER1": 10, "HR_COUNTER2": "5"}],
            "ls_periodos": {"semana": 604800, "turno": 28800},
            "menos_periodo": {"semana": "turno"},
            "periodo": "semana"
        }))
        .unwrap();

        assert_eq!(bundle.rawdata.len(), 2);
        assert_eq!(bundle.rawdata[1].hr_counter2, Some(json!("5")));
        assert_eq!(bundle.drill_down(), Some((&PeriodName::from("turno"), 28800.0)));
    }

    #[test]
    fn test_drill_down_missing_target() {
        let bundle = ChartDataBundle {
            periodo: PeriodName::from("hora"),
            ..Default::default()
        };
        assert!(bundle.drill_down().is_none());
    }
}
