//! Turns a validated chart bundle into plotted series

use datamaq_shared::{ChartDataBundle, DataPoint};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Raw counters are accumulated over this many units per sample window.
pub const DEFAULT_VALUE_DIVISOR: f64 = 5.0;

/// Constant level drawn by the running indicator series.
pub const DEFAULT_MARCHA_VALUE: f64 = 20.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("sample {index}: {field} is not numeric ({value})")]
    NonNumeric {
        index: usize,
        field: &'static str,
        value: String,
    },
}

/// One plotted line: `[timestamp_ms, value]` pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub animation: bool,
    pub data: Vec<[f64; 2]>,
}

impl Series {
    pub fn new(name: impl Into<String>, data: Vec<[f64; 2]>) -> Self {
        Self {
            name: name.into(),
            animation: false,
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    divisor: f64,
    marcha_value: f64,
}

impl Default for SeriesBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_VALUE_DIVISOR, DEFAULT_MARCHA_VALUE)
    }
}

impl SeriesBuilder {
    pub fn new(divisor: f64, marcha_value: f64) -> Self {
        Self {
            divisor,
            marcha_value,
        }
    }

    /// `[inductive, optical, marcha]`. A series that fails to build is empty.
    pub fn build_series(&self, chart_data: &ChartDataBundle) -> Vec<Series> {
        vec![
            Series::new(
                "Sensor inductivo",
                self.settle("Sensor inductivo", self.counter_data(chart_data, "HR_COUNTER1", |p| {
                    p.hr_counter1.as_ref()
                })),
            ),
            Series::new(
                "Sensor optico",
                self.settle("Sensor optico", self.counter_data(chart_data, "HR_COUNTER2", |p| {
                    p.hr_counter2.as_ref()
                })),
            ),
            Series::new("marcha", self.marcha_data(chart_data)),
        ]
    }

    /// Minimal series used when a full render fails.
    pub fn fallback_series(now_ms: f64) -> Vec<Series> {
        vec![Series::new("Fallback", vec![[now_ms, 0.0]])]
    }

    fn settle(&self, name: &str, data: Result<Vec<[f64; 2]>, SeriesError>) -> Vec<[f64; 2]> {
        match data {
            Ok(points) => {
                log::debug!("SeriesBuilder - series '{name}' built: {} points", points.len());
                points
            }
            Err(e) => {
                log::error!("SeriesBuilder - series '{name}' failed: {e}");
                Vec::new()
            }
        }
    }

    fn counter_data(
        &self,
        chart_data: &ChartDataBundle,
        field: &'static str,
        counter: impl Fn(&DataPoint) -> Option<&Value>,
    ) -> Result<Vec<[f64; 2]>, SeriesError> {
        let mut data = Vec::new();
        // Sample 0 is the anchor of the window, not a plotted point.
        for (index, point) in chart_data.rawdata.iter().enumerate().skip(1) {
            let (Some(time), Some(raw)) = (point.unixtime, counter(point)) else {
                continue;
            };
            let value = numeric(raw).ok_or_else(|| SeriesError::NonNumeric {
                index,
                field,
                value: raw.to_string(),
            })?;
            data.push([time.as_millis(), value / self.divisor]);
        }
        Ok(data)
    }

    fn marcha_data(&self, chart_data: &ChartDataBundle) -> Vec<[f64; 2]> {
        chart_data
            .rawdata
            .iter()
            .skip(1)
            .filter_map(|point| point.unixtime)
            .map(|time| [time.as_millis(), self.marcha_value])
            .collect()
    }
}

fn numeric(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(rawdata: Value) -> ChartDataBundle {
        ChartDataBundle::from_value(json!({
            "conta": null,
            "rawdata": rawdata,
            "ls_periodos": {},
            "menos_periodo": {},
            "periodo": "semana"
        }))
        .unwrap()
    }

    #[test]
    fn test_anchor_sample_is_skipped() {
        let data = bundle(json!([
            {"unixtime": 0, "HR_COUNTER1": 0},
            {"unixtime": 10, "HR_COUNTER1": 50}
        ]));
        let series = SeriesBuilder::default().build_series(&data);

        assert_eq!(series[0].name, "Sensor inductivo");
        assert_eq!(series[0].data, vec![[10000.0, 10.0]]);
        assert!(series[1].data.is_empty());
        assert_eq!(series[2].data, vec![[10000.0, 20.0]]);
    }

    #[test]
    fn test_missing_fields_omit_points() {
        let data = bundle(json!([
            {"unixtime": 1},
            {"unixtime": 2, "HR_COUNTER2": 15},
            {"HR_COUNTER2": 99},
            {"unixtime": 4, "HR_COUNTER1": "25"}
        ]));
        let series = SeriesBuilder::default().build_series(&data);

        assert_eq!(series[0].data, vec![[4000.0, 5.0]]);
        assert_eq!(series[1].data, vec![[2000.0, 3.0]]);
        assert_eq!(series[2].data.len(), 2);
    }

    #[test]
    fn test_bad_counter_only_empties_its_series() {
        let data = bundle(json!([
            {"unixtime": 1},
            {"unixtime": 2, "HR_COUNTER1": "n/a", "HR_COUNTER2": 10}
        ]));
        let series = SeriesBuilder::default().build_series(&data);

        assert!(series[0].data.is_empty());
        assert_eq!(series[1].data, vec![[2000.0, 2.0]]);
        assert_eq!(series[2].data, vec![[2000.0, 20.0]]);
    }
}
