//! Summary report (`.rst`) parser.
//!
//! The report is a sequence of dialogs. A crossing dialog selects the crossing
//! that subsequent rows belong to; culvert tables inside it contribute the
//! discharge, headwater and velocity columns.

use std::collections::BTreeMap;
use std::path::Path;

use crate::types::ResultSeries;
use crate::{ResultsError, ResultsResult};

const CROSSING_DIALOG: &str = "Summary of Flows at Crossing";
const CULVERT_DIALOG: &str = "Culvert Summary Table";

const ROADWAY_ROW: &str = "Roadway Discharge";
const ITERATIONS_ROW: &str = "Iterations";
const FLOW_ROW: &str = "Total Discharge";
const HEADWATER_ROW: &str = "Headwater Elevation";
const VELOCITY_ROW: &str = "Outlet Velocity";

/// Name following `Dialog:<whitespace><title> - `.
fn dialog_name<'a>(line: &'a str, title: &str) -> Option<&'a str> {
    let rest = line.strip_prefix("Dialog:")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest
        .trim_start()
        .strip_prefix(title)?
        .strip_prefix(" - ")?
        .trim();
    (!name.is_empty()).then_some(name)
}

/// Comma-separated cells after the row label. Blank, `nan` and unparseable
/// cells become NaN.
pub fn numeric_cells(line: &str) -> Vec<f64> {
    line.split(',')
        .skip(1)
        .map(|cell| {
            let cell = cell.trim();
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                f64::NAN
            } else {
                cell.parse().unwrap_or(f64::NAN)
            }
        })
        .collect()
}

/// Text cells after the row label, trimmed, empty cells dropped.
pub fn text_cells(line: &str) -> Vec<String> {
    line.split(',')
        .skip(1)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_summary(text: &str) -> BTreeMap<String, ResultSeries> {
    let mut data: BTreeMap<String, ResultSeries> = BTreeMap::new();
    let mut crossing: Option<String> = None;
    let mut in_culvert_table = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = dialog_name(line, CROSSING_DIALOG) {
            data.entry(name.to_string()).or_default();
            crossing = Some(name.to_string());
            in_culvert_table = false;
            continue;
        }
        let Some(current) = crossing.as_deref() else {
            continue;
        };
        let series = data.entry(current.to_string()).or_default();
        if line.starts_with(ROADWAY_ROW) {
            series.roadway_discharges = numeric_cells(line);
        } else if line.starts_with(ITERATIONS_ROW) {
            series.iterations = text_cells(line);
        }
        if dialog_name(line, CULVERT_DIALOG).is_some() {
            in_culvert_table = true;
            continue;
        }
        if !in_culvert_table {
            continue;
        }
        if line.starts_with(FLOW_ROW) {
            series.flows = numeric_cells(line);
        } else if line.starts_with(HEADWATER_ROW) {
            series.headwaters = numeric_cells(line);
        } else if line.starts_with(VELOCITY_ROW) {
            series.velocities = numeric_cells(line);
        }
    }
    data
}

/// Read a summary report. A missing report means the solver did not run.
pub fn read_summary(path: &Path) -> ResultsResult<BTreeMap<String, ResultSeries>> {
    if !path.exists() {
        return Err(ResultsError::MissingReport {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path)?;
    let data = parse_summary(&String::from_utf8_lossy(&bytes));
    tracing::debug!(path = %path.display(), crossings = data.len(), "parsed summary report");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Dialog:  Summary of Flows at Crossing - Main Street
Headwater Elevation (ft), 100.00, 101.00
Roadway Discharge (cfs), 0.00, 1.25, nan
Iterations, 1, 5 , Roadway Overtopping,
Dialog:\tCulvert Summary Table - Barrel 1
Total Discharge (cfs), 5.0, 10.0, 15.0
Headwater Elevation (ft), 100.5, , abc
Outlet Velocity (ft/s), 3.1, 4.2, 5.3

Dialog:  Summary of Flows at Crossing - Side Road
Total Discharge (cfs), 99.0
";

    #[test]
    fn parses_crossing_and_culvert_rows() {
        let data = parse_summary(REPORT);
        let main = &data["Main Street"];
        assert_eq!(main.flows, vec![5.0, 10.0, 15.0]);
        assert_eq!(main.headwaters[0], 100.5);
        assert!(main.headwaters[1].is_nan());
        assert!(main.headwaters[2].is_nan());
        assert_eq!(main.velocities, vec![3.1, 4.2, 5.3]);
        assert_eq!(main.roadway_discharges[1], 1.25);
        assert!(main.roadway_discharges[2].is_nan());
        assert_eq!(main.iterations, vec!["1", "5", "Roadway Overtopping"]);
    }

    #[test]
    fn culvert_rows_need_a_culvert_table() {
        let data = parse_summary(REPORT);
        assert!(data["Side Road"].flows.is_empty());
    }

    #[test]
    fn dialog_requires_whitespace_and_name() {
        assert_eq!(dialog_name("Dialog: Culvert Summary Table - A", CULVERT_DIALOG), Some("A"));
        assert_eq!(dialog_name("Dialog:Culvert Summary Table - A", CULVERT_DIALOG), None);
        assert_eq!(dialog_name("Dialog: Culvert Summary Table - ", CULVERT_DIALOG), None);
    }

    #[test]
    fn rows_before_any_crossing_are_ignored() {
        let data = parse_summary("Total Discharge (cfs), 1, 2\n");
        assert!(data.is_empty());
    }

    #[test]
    fn missing_summary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_summary(&dir.path().join("run.rst")).unwrap_err();
        assert!(matches!(err, ResultsError::MissingReport { .. }));
    }
}
