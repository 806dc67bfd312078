//! Result data types.

use cf_core::distance;
use serde::Serialize;

/// Per-crossing columns of the summary report, aligned by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSeries {
    pub flows: Vec<f64>,
    pub headwaters: Vec<f64>,
    pub velocities: Vec<f64>,
    pub roadway_discharges: Vec<f64>,
    pub iterations: Vec<String>,
}

impl ResultSeries {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// One flow profile block of the detail report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProfile {
    pub flow: f64,
    /// Headwater depth divided by barrel depth.
    pub headwater_ratio: f64,
    pub flow_type: String,
    pub overtopping: bool,
}

impl Default for FlowProfile {
    fn default() -> Self {
        Self {
            flow: f64::NAN,
            headwater_ratio: f64::NAN,
            flow_type: String::new(),
            overtopping: false,
        }
    }
}

/// Profile whose flow is closest to `target`. NaN flows never match.
pub fn nearest_profile(profiles: &[FlowProfile], target: f64) -> Option<&FlowProfile> {
    nearest_by(profiles, target, |p| p.flow)
}

fn nearest_by<T>(items: &[T], target: f64, key: impl Fn(&T) -> f64) -> Option<&T> {
    if target.is_nan() {
        return None;
    }
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let flow = key(item);
        if flow.is_nan() {
            continue;
        }
        let delta = distance(flow, target);
        if best.is_none_or(|(_, d)| delta < d) {
            best = Some((item, delta));
        }
    }
    best.map(|(item, _)| item)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub flow: f64,
    pub headwater_elevation: f64,
    pub velocity: f64,
    pub roadway_discharge: f64,
    pub iterations: String,
    pub headwater_ratio: f64,
    pub flow_type: String,
    pub overtopping: bool,
}

impl Default for ResultRow {
    fn default() -> Self {
        Self {
            flow: f64::NAN,
            headwater_elevation: f64::NAN,
            velocity: f64::NAN,
            roadway_discharge: f64::NAN,
            iterations: String::new(),
            headwater_ratio: f64::NAN,
            flow_type: String::new(),
            overtopping: false,
        }
    }
}

impl ResultRow {
    /// Row carrying only a flow and headwater.
    pub fn with_headwater(flow: f64, headwater_elevation: f64) -> Self {
        Self {
            flow,
            headwater_elevation,
            ..Self::default()
        }
    }
}

/// Summary rows merged with their nearest detail profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn merge(series: &ResultSeries, profiles: &[FlowProfile]) -> Self {
        fn column(values: &[f64], idx: usize) -> f64 {
            values.get(idx).copied().unwrap_or(f64::NAN)
        }
        let rows = series
            .flows
            .iter()
            .enumerate()
            .map(|(idx, &flow)| {
                let iterations = series.iterations.get(idx).cloned().unwrap_or_default();
                let profile = nearest_profile(profiles, flow);
                let overtopping = profile.is_some_and(|p| p.overtopping)
                    || iterations.to_lowercase().contains("overtopping");
                ResultRow {
                    flow,
                    headwater_elevation: column(&series.headwaters, idx),
                    velocity: column(&series.velocities, idx),
                    roadway_discharge: column(&series.roadway_discharges, idx),
                    headwater_ratio: profile.map_or(f64::NAN, |p| p.headwater_ratio),
                    flow_type: profile.map(|p| p.flow_type.clone()).unwrap_or_default(),
                    overtopping,
                    iterations,
                }
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn nearest(&self, target: f64) -> Option<&ResultRow> {
        nearest_by(&self.rows, target, |row| row.flow)
    }

    /// Largest roadway overflow, 0 when none is reported.
    pub fn roadway_max(&self) -> f64 {
        self.rows
            .iter()
            .map(|row| row.roadway_discharge)
            .filter(|q| !q.is_nan())
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |m| m.max(q))))
            .unwrap_or(0.0)
    }
}
