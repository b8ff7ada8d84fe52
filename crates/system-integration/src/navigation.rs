//! Drill-down navigation triggered by a double click

use datamaq_shared::{ChartDataBundle, PeriodName};

/// Page navigation seam
pub trait Navigator: Send + Sync {
    /// Load the dashboard with `query` (`?periodo=..&conta=..`).
    fn navigate(&self, query: &str);
}

/// Where a double click at `x` drills into
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomTarget {
    pub periodo: PeriodName,
    pub conta: f64,
}

impl ZoomTarget {
    /// The next finer period centred on `x`: `x + ls_periodos[target] / 2`.
    pub fn from_click(bundle: &ChartDataBundle, x: f64) -> Option<Self> {
        let Some((periodo, window)) = bundle.drill_down() else {
            log::warn!(
                "ZoomTarget - no drill-down period or duration for '{}'",
                bundle.periodo
            );
            return None;
        };
        Some(Self {
            periodo: periodo.clone(),
            conta: x + window / 2.0,
        })
    }

    pub fn query_string(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("periodo", self.periodo.as_str())
            .append_pair("conta", &self.conta.to_string())
            .finish();
        format!("?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bundle() -> ChartDataBundle {
        ChartDataBundle {
            ls_periodos: BTreeMap::from([
                (PeriodName::from("semana"), 604800.0),
                (PeriodName::from("turno"), 28800.0),
            ]),
            menos_periodo: BTreeMap::from([(PeriodName::from("semana"), PeriodName::from("turno"))]),
            periodo: PeriodName::from("semana"),
            ..Default::default()
        }
    }

    #[test]
    fn test_zoom_target() {
        // x-axis values are epoch milliseconds
        let target = ZoomTarget::from_click(&bundle(), 1_700_000_000_000.0).unwrap();
        assert_eq!(target.periodo.as_str(), "turno");
        assert_eq!(target.conta, 1_700_000_014_400.0);
        assert_eq!(target.query_string(), "?periodo=turno&conta=1700000014400");
    }

    #[test]
    fn test_missing_drill_period() {
        let mut data = bundle();
        data.periodo = PeriodName::from("hora");
        assert!(ZoomTarget::from_click(&data, 1.0).is_none());
    }
}
