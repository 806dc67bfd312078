//! Detail report (`.rsql`) parser.

use std::collections::BTreeMap;
use std::path::Path;

use crate::ResultsResult;
use crate::types::FlowProfile;

fn parse_number(value: &str) -> f64 {
    value.parse().unwrap_or(f64::NAN)
}

pub fn parse_detail(text: &str) -> BTreeMap<String, Vec<FlowProfile>> {
    let mut data: BTreeMap<String, Vec<FlowProfile>> = BTreeMap::new();
    let mut crossing: Option<String> = None;
    let mut profile: Option<FlowProfile> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix("Crossing:") {
            crossing = Some(name.trim().to_string());
            continue;
        }
        if line.starts_with("FlowProfileName:") {
            profile = Some(FlowProfile::default());
            continue;
        }
        let (Some(name), Some(current)) = (crossing.as_deref(), profile.as_mut()) else {
            continue;
        };
        if line.starts_with("EndFlowProfile") {
            if let Some(done) = profile.take() {
                data.entry(name.to_string()).or_default().push(done);
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "FlowProfileFlow" => current.flow = parse_number(value),
            "HeadwaterToDepth" => current.headwater_ratio = parse_number(value),
            "FlowType" => current.flow_type = value.to_string(),
            "Overtops" => current.overtopping = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }
    data
}

/// Read a detail report; a missing file yields no profiles.
pub fn read_detail(path: &Path) -> ResultsResult<BTreeMap<String, Vec<FlowProfile>>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "detail report not produced");
        return Ok(BTreeMap::new());
    }
    let bytes = std::fs::read(path)?;
    Ok(parse_detail(&String::from_utf8_lossy(&bytes)))
}
