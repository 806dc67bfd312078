//! Project file encoder.

use cf_core::UnitSystem;
use cf_project::{
    Barrel, Crossing, Flow, Project, Roadway, SYNTHETIC_FLOW_LABEL, Tailwater,
    check_supported, validate_project,
};

use crate::cards::HEADER_KEY;
use crate::columns::{CardValue, format_card};
use crate::error::CodecResult;

pub const DEFAULT_VERSION: f64 = 80.0;

#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Written directly after the header key.
    pub version: f64,
    /// `PROJDATE` in hours since the Unix epoch; the current time when `None`.
    pub project_date_hours: Option<f64>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            project_date_hours: None,
        }
    }
}

impl EncodeOptions {
    /// Options with a fixed date so identical projects encode identically.
    pub fn reproducible() -> Self {
        Self {
            project_date_hours: Some(0.0),
            ..Self::default()
        }
    }

    fn version_text(&self) -> String {
        if self.version.fract() == 0.0 && self.version.is_finite() {
            format!("{}", self.version as i64)
        } else {
            format!("{}", self.version)
        }
    }
}

fn hours_since_epoch() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 3_600_000.0
}

/// Flows as written to the file, with the single-value shim applied.
///
/// The solver needs at least two user-defined flows, so `[v]` becomes
/// `{0.1 v, v}` in increasing order. When labels are in use the synthesized
/// point carries [`SYNTHETIC_FLOW_LABEL`].
pub fn written_flows(flow: &Flow) -> (Vec<f64>, Vec<String>) {
    match flow {
        Flow::MinDesignMax { .. } => (flow.sequence(), Vec::new()),
        Flow::UserDefined { values, labels } => {
            if let [only] = values[..] {
                let synthetic = 0.1 * only;
                let label = labels.first().cloned().unwrap_or_default();
                let use_labels = !labels.is_empty();
                let (values, labels) = if synthetic <= only {
                    (vec![synthetic, only], [SYNTHETIC_FLOW_LABEL.to_string(), label])
                } else {
                    (vec![only, synthetic], [label, SYNTHETIC_FLOW_LABEL.to_string()])
                };
                let labels = if use_labels { labels.to_vec() } else { Vec::new() };
                (values, labels)
            } else {
                (values.clone(), labels.clone())
            }
        }
    }
}

/// Render a project with default options.
pub fn encode(project: &Project) -> CodecResult<String> {
    encode_with(project, &EncodeOptions::default())
}

pub fn encode_with(project: &Project, options: &EncodeOptions) -> CodecResult<String> {
    check_supported(project)?;
    validate_project(project)?;

    let mut writer = CardWriter {
        out: String::with_capacity(4096),
        units: project.units,
    };
    writer.out.push_str(HEADER_KEY);
    writer.out.push_str(&options.version_text());
    writer.out.push('\n');
    writer.project(project, options);

    tracing::debug!(
        title = %project.display_title(),
        crossings = project.crossings.len(),
        bytes = writer.out.len(),
        "encoded project file"
    );
    Ok(writer.out)
}

struct CardWriter {
    out: String,
    units: UnitSystem,
}

impl CardWriter {
    fn card(&mut self, name: &str, values: &[CardValue]) {
        self.out.push_str(&format_card(name, values));
        self.out.push('\n');
    }

    fn length(&self, value: f64) -> CardValue {
        CardValue::Float(self.units.length_to_native(value))
    }

    fn flow(&self, value: f64) -> CardValue {
        CardValue::Float(self.units.flow_to_native(value))
    }

    fn project(&mut self, project: &Project, options: &EncodeOptions) {
        let date = options.project_date_hours.unwrap_or_else(hours_since_epoch);
        self.card("UNITS", &[project.units.project_flag().into()]);
        self.card("EXITLOSSOPTION", &[project.exit_loss_option.into()]);
        self.card("PROJTITLE", &[CardValue::Text(project.title.clone())]);
        self.card("PROJDESIGNER", &[CardValue::Text(project.designer.clone())]);
        self.card("STARTPROJNOTES", &[CardValue::Text(project.notes.clone())]);
        self.card("ENDPROJNOTES", &[]);
        self.card("PROJDATE", &[date.into()]);
        self.card("NUMCROSSINGS", &[project.crossings.len().into()]);
        for crossing in &project.crossings {
            self.crossing(crossing);
        }
        self.out.push_str("ENDPROJECTFILE");
    }

    fn crossing(&mut self, crossing: &Crossing) {
        self.card("STARTCROSSING", &[CardValue::quoted(&crossing.name)]);
        let notes = crossing.notes.replace(['\r', '\n'], " ");
        self.card("STARTCROSSNOTES", &[CardValue::quoted(&notes)]);
        self.flow_cards(&crossing.flow);
        self.tailwater(&crossing.tailwater);
        self.roadway(&crossing.roadway);
        self.card("NUMCULVERTS", &[crossing.barrels.len().into()]);
        for barrel in &crossing.barrels {
            self.barrel(barrel);
        }
        if let Some(guid) = &crossing.guid {
            self.card("CROSSGUID", &[CardValue::Text(guid.clone())]);
        }
        self.card("ENDCROSSING", &[CardValue::quoted(&crossing.name)]);
    }

    fn flow_cards(&mut self, flow: &Flow) {
        let (values, labels) = written_flows(flow);
        let range = match flow {
            Flow::MinDesignMax {
                minimum,
                design,
                maximum,
            } => [*minimum, *design, *maximum],
            Flow::UserDefined { .. } => match (values.first(), values.last()) {
                (Some(first), Some(last)) => [*first, values[values.len() / 2], *last],
                _ => [0.0; 3],
            },
        };
        let method = flow.method().code();

        let range_values: Vec<CardValue> = range.iter().map(|v| self.flow(*v)).collect();
        self.card("DISCHARGERANGE", &range_values);
        self.card("DISCHARGEMETHOD", &[method.into()]);
        self.card("DISCHARGEXYUSER", &[values.len().into()]);
        for (idx, value) in values.iter().enumerate() {
            let y = self.flow(*value);
            self.card("DISCHARGEXYUSER_Y", &[y]);
            if !labels.is_empty() {
                let label = labels.get(idx).map(String::as_str).unwrap_or("");
                self.card("DISCHARGEXYUSER_NAME", &[CardValue::quoted(label)]);
            }
        }
    }

    fn tailwater(&mut self, tailwater: &Tailwater) {
        self.card("TAILWATERTYPE", &[tailwater.kind.code().into()]);
        let geometry = [
            self.length(tailwater.bottom_width),
            tailwater.sideslope.into(),
            tailwater.channel_slope.into(),
            tailwater.manning_n.into(),
            self.length(tailwater.invert_elevation),
        ];
        self.card("CHANNELGEOMETRY", &geometry);

        let rows = tailwater.stage_count();
        self.card("NUMRATINGCURVE", &[rows.into()]);
        let row = [
            self.length(tailwater.constant_elevation),
            CardValue::Float(0.0),
            CardValue::Float(0.0),
            CardValue::Float(0.0),
        ];
        self.card("TWRATINGCURVE", &row);
        for _ in 1..rows {
            self.card("", &row);
        }
    }

    fn roadway(&mut self, roadway: &Roadway) {
        self.card("ROADWAYSHAPE", &[roadway.shape.into()]);
        let width = self.length(roadway.width);
        self.card("ROADWIDTH", &[width]);
        self.card("SURFACE", &[roadway.surface.code().into()]);
        self.card("NUMSTATIONS", &[roadway.stations.len().into()]);
        for (idx, (station, elevation)) in roadway.points().enumerate() {
            let name = if idx == 0 { "ROADWAYSECDATA" } else { "ROADWAYPOINT" };
            let point = [self.length(station), self.length(elevation)];
            self.card(name, &point);
        }
    }

    fn barrel(&mut self, barrel: &Barrel) {
        let manning = barrel.manning_values();
        self.card("STARTCULVERT", &[CardValue::quoted(&barrel.name)]);
        self.card("CULVERTSHAPE", &[barrel.shape.code().into()]);
        self.card("CULVERTMATERIAL", &[barrel.written_material().code().into()]);
        self.card("INLETTYPE", &[barrel.inlet_type.code().into()]);
        self.card("INLETEDGETYPE", &[barrel.inlet_edge_type.code().into()]);
        self.card("INLETEDGETYPE71", &[barrel.inlet_edge_type71.code().into()]);
        self.card(
            "IMPINLETEDGETYPE",
            &[barrel.improved_inlet_edge_type.code().into()],
        );
        let data = [
            self.length(barrel.span),
            self.length(barrel.rise),
            manning.top.into(),
            manning.bottom.into(),
        ];
        self.card("BARRELDATA", &data);
        self.card("EMBANKMENTTYPE", &[CardValue::Int(2)]);
        self.card("NUMBEROFBARRELS", &[barrel.number_of_barrels.into()]);
        let inverts = [
            self.length(barrel.inlet_invert_station),
            self.length(barrel.inlet_invert_elevation),
            self.length(barrel.outlet_invert_station),
            self.length(barrel.outlet_invert_elevation),
        ];
        self.card("INVERTDATA", &inverts);
        self.card("STARTCULVNOTES", &[CardValue::quoted(&barrel.notes)]);
        self.card("ENDCULVNOTES", &[]);
        let station = self.length(barrel.roadway_station);
        self.card("ROADCULVSTATION", &[station]);
        let spacing = self.length(barrel.effective_spacing());
        self.card("BARRELSPACING", &[spacing]);
        self.card("ENDCULVERT", &[CardValue::quoted(&barrel.name)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_flow_is_padded_with_a_tenth() {
        let (values, labels) = written_flows(&Flow::user_defined(vec![12.0]));
        assert_eq!(values.len(), 2);
        assert!((values[0] - 1.2).abs() < 1e-12);
        assert_eq!(values[1], 12.0);
        assert!(labels.is_empty());
    }

    #[test]
    fn single_labelled_flow_gets_sentinel_label() {
        let flow = Flow::labelled(vec![12.0], vec!["design".into()]);
        let (_, labels) = written_flows(&flow);
        assert_eq!(labels, vec!["dummy flow".to_string(), "design".to_string()]);
    }

    #[test]
    fn zero_flow_shim_duplicates_zero() {
        let (values, _) = written_flows(&Flow::user_defined(vec![0.0]));
        assert_eq!(values, vec![0.0, 0.0]);
    }

    #[test]
    fn version_text_drops_integral_decimals() {
        assert_eq!(EncodeOptions::default().version_text(), "80");
        let custom = EncodeOptions {
            version: 80.5,
            ..EncodeOptions::default()
        };
        assert_eq!(custom.version_text(), "80.5");
    }
}
