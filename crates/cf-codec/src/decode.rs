//! Project file decoder.
//!
//! Recursive descent over [`CardStream`]. Values in the file are native units
//! and are converted to the project's unit system as they are assigned.

use cf_core::{Tolerances, UnitSystem, nearly_equal};
use cf_project::{
    Barrel, Crossing, CulvertMaterial, CulvertShape, Flow, FlowMethod, ImprovedInletEdgeType,
    InletEdgeType, InletEdgeType71, InletType, ManningPair, Project, RoadwaySurface,
    TailwaterType,
};

use crate::cards::{Card, CardStream, HEADER_KEY};
use crate::error::{CodecError, CodecResult};

/// Parse project file text into a [`Project`].
pub fn decode(source: &str) -> CodecResult<Project> {
    let mut parser = Decoder {
        stream: CardStream::new(source),
        units: UnitSystem::default(),
    };
    let project = parser.project()?;
    tracing::debug!(
        title = %project.display_title(),
        crossings = project.crossings.len(),
        units = %project.units,
        "decoded project file"
    );
    Ok(project)
}

/// Constant increment of an evenly spaced sequence of at least three values.
///
/// Not applied by [`decode`]; callers that want to present a flow list as
/// min/max/increment can use it on the decoded values.
pub fn detect_increment(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let first = values[1] - values[0];
    if first == 0.0 || !first.is_finite() {
        return None;
    }
    let tolerance = first.abs().max(1.0) * 1e-6;
    values
        .windows(2)
        .skip(1)
        .all(|w| ((w[1] - w[0]) - first).abs() <= tolerance)
        .then_some(first)
}

/// Strip one pair of surrounding double quotes, then whitespace.
fn clean_text(raw: &str) -> String {
    let text = raw.trim();
    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    unquoted.trim().to_string()
}

/// First `limit` tokens that parse as floats; malformed tokens are skipped.
fn floats(value: &str, limit: usize) -> Vec<f64> {
    value
        .split_whitespace()
        .filter_map(|token| token.parse::<f64>().ok())
        .take(limit)
        .collect()
}

fn first_int(value: &str) -> Option<i64> {
    value.split_whitespace().next()?.parse().ok()
}

fn first_float(value: &str) -> Option<f64> {
    value.split_whitespace().next()?.parse().ok()
}

fn is_derived(value: f64, derived: f64) -> bool {
    nearly_equal(value, derived, Tolerances::FILE_PRECISION)
}

#[derive(Default)]
struct PendingFlow {
    range: [f64; 3],
    method: Option<FlowMethod>,
    values: Vec<f64>,
    labels: Vec<String>,
    labelled: bool,
}

impl PendingFlow {
    fn finish(self) -> Flow {
        let method = self.method.unwrap_or(if self.values.is_empty() {
            FlowMethod::MinDesignMax
        } else {
            FlowMethod::UserDefined
        });
        match method {
            FlowMethod::MinDesignMax => {
                let [minimum, design, maximum] = self.range;
                Flow::MinDesignMax {
                    minimum,
                    design,
                    maximum,
                }
            }
            FlowMethod::UserDefined => Flow::UserDefined {
                values: self.values,
                labels: if self.labelled { self.labels } else { Vec::new() },
            },
        }
    }
}

struct Decoder<'a> {
    stream: CardStream<'a>,
    units: UnitSystem,
}

impl Decoder<'_> {
    fn length(&self, native: f64) -> f64 {
        self.units.length_from_native(native)
    }

    fn flow(&self, native: f64) -> f64 {
        self.units.flow_from_native(native)
    }

    fn project(&mut self) -> CodecResult<Project> {
        match self.stream.next_card() {
            Some(card) if card.key == HEADER_KEY => {}
            Some(card) => {
                return Err(CodecError::format(
                    card.line,
                    format!("expected {HEADER_KEY} header, found '{}'", card.key),
                ));
            }
            None => return Err(CodecError::format(0, "project file is empty")),
        }

        let mut project = Project::default();
        while let Some(card) = self.stream.next_card() {
            match card.key.as_str() {
                "ENDPROJECTFILE" => break,
                "UNITS" => {
                    let flag = first_int(&card.value).unwrap_or(0);
                    project.units = UnitSystem::from_project_flag(flag);
                    self.units = project.units;
                }
                "EXITLOSSOPTION" => {
                    project.exit_loss_option = first_int(&card.value).unwrap_or(0);
                }
                "PROJTITLE" => project.title = clean_text(&card.value),
                "PROJDESIGNER" => project.designer = clean_text(&card.value),
                "STARTPROJNOTES" => {
                    project.notes = self.notes(&card.value, "ENDPROJNOTES")?;
                }
                "STARTCROSSING" => {
                    let crossing = self.crossing(&card)?;
                    project.crossings.push(crossing);
                }
                _ => {}
            }
        }
        Ok(project)
    }

    fn notes(&mut self, inline: &str, terminator: &str) -> CodecResult<String> {
        let mut parts = vec![inline.trim().to_string()];
        parts.extend(self.stream.read_block(terminator)?);
        let joined = parts.join("\n");
        let text = clean_text(&joined);
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn crossing(&mut self, start: &Card) -> CodecResult<Crossing> {
        let mut crossing = Crossing::new(clean_text(&start.value));
        let mut flow = PendingFlow::default();

        loop {
            let Some(card) = self.stream.next_card() else {
                return Err(CodecError::format(
                    self.stream.line(),
                    format!(
                        "crossing '{}' starting at line {} has no ENDCROSSING",
                        crossing.name, start.line
                    ),
                ));
            };
            let value = card.value.as_str();
            match card.key.as_str() {
                "ENDCROSSING" => break,
                "STARTCROSSNOTES" => crossing.notes = clean_text(value),
                "DISCHARGERANGE" => {
                    for (slot, v) in flow.range.iter_mut().zip(floats(value, 3)) {
                        *slot = self.flow(v);
                    }
                }
                "DISCHARGEMETHOD" => {
                    let code = first_int(value).unwrap_or(0);
                    let method = FlowMethod::from_code(code).ok_or_else(|| {
                        CodecError::UnsupportedFeature {
                            feature: format!("discharge method {code}"),
                            reason: format!(
                                "crossing '{}' must use min/design/max or user-defined flows",
                                crossing.name
                            ),
                        }
                    })?;
                    flow.method = Some(method);
                }
                "DISCHARGEXYUSER" => {
                    let expected = first_int(value).unwrap_or(0).max(0);
                    self.user_flows(usize::try_from(expected).unwrap_or(0), &mut flow);
                }
                "TAILWATERTYPE" => {
                    crossing.tailwater.kind = first_int(value)
                        .and_then(TailwaterType::from_code)
                        .unwrap_or_default();
                }
                "CHANNELGEOMETRY" => {
                    let numbers = floats(value, 5);
                    let tw = &mut crossing.tailwater;
                    if let Some(v) = numbers.first() {
                        tw.bottom_width = self.units.length_from_native(*v);
                    }
                    if let Some(v) = numbers.get(1) {
                        tw.sideslope = *v;
                    }
                    if let Some(v) = numbers.get(2) {
                        tw.channel_slope = *v;
                    }
                    if let Some(v) = numbers.get(3) {
                        tw.manning_n = *v;
                    }
                    if let Some(v) = numbers.get(4) {
                        tw.invert_elevation = self.units.length_from_native(*v);
                    }
                }
                "TWRATINGCURVE" => {
                    if let Some(stage) = floats(value, 1).first() {
                        crossing.tailwater.constant_elevation = self.length(*stage);
                    }
                }
                "NUMRATINGCURVE" => {
                    if let Some(n) = first_int(value) {
                        crossing.tailwater.rating_curve_entries = n;
                    }
                }
                "RATINGCURVE" => self.stream.skip_until("END RATINGCURVE")?,
                "ROADWAYSHAPE" => {
                    crossing.roadway.shape = first_int(value).unwrap_or(crossing.roadway.shape);
                }
                "ROADWIDTH" => {
                    if let Some(width) = first_float(value) {
                        crossing.roadway.width = self.length(width);
                    }
                }
                "SURFACE" => {
                    crossing.roadway.surface = first_int(value)
                        .and_then(RoadwaySurface::from_code)
                        .unwrap_or_default();
                }
                "ROADWAYSECDATA" | "ROADWAYPOINT" => {
                    if let [station, elevation] = floats(value, 2)[..] {
                        let (station, elevation) = (self.length(station), self.length(elevation));
                        crossing.roadway.add_point(station, elevation);
                    }
                }
                "STARTCULVERT" => {
                    let barrel = self.culvert(&card)?;
                    crossing.barrels.push(barrel);
                }
                "CROSSGUID" => {
                    let guid = clean_text(value);
                    crossing.guid = (!guid.is_empty()).then_some(guid);
                }
                _ => {}
            }
        }

        crossing.flow = flow.finish();
        Ok(crossing)
    }

    /// Reads up to `expected` value cards, each optionally followed by a
    /// label card. Any other card ends the aggregate and is pushed back.
    fn user_flows(&mut self, expected: usize, flow: &mut PendingFlow) {
        flow.values.clear();
        flow.labels.clear();
        flow.labelled = false;
        if expected == 0 {
            return;
        }
        while let Some(card) = self.stream.next_card() {
            match card.key.as_str() {
                "DISCHARGEXYUSER_Y" if flow.values.len() < expected => {
                    let value = first_float(&card.value).unwrap_or(0.0);
                    flow.values.push(self.flow(value));
                    flow.labels.push(String::new());
                }
                "DISCHARGEXYUSER_NAME" if !flow.values.is_empty() => {
                    if let Some(label) = flow.labels.last_mut() {
                        *label = clean_text(&card.value);
                    }
                    flow.labelled = true;
                    if flow.values.len() == expected {
                        return;
                    }
                }
                _ => {
                    self.stream.push_back(card);
                    return;
                }
            }
        }
    }

    fn culvert(&mut self, start: &Card) -> CodecResult<Barrel> {
        let mut barrel = Barrel {
            name: clean_text(&start.value),
            ..Barrel::default()
        };
        let mut manning: Option<ManningPair> = None;

        loop {
            let Some(card) = self.stream.next_card() else {
                return Err(CodecError::format(
                    self.stream.line(),
                    format!(
                        "culvert '{}' starting at line {} has no ENDCULVERT",
                        barrel.name, start.line
                    ),
                ));
            };
            let value = card.value.as_str();
            match card.key.as_str() {
                "ENDCULVERT" => break,
                "CULVERTSHAPE" => {
                    barrel.shape = first_int(value)
                        .and_then(CulvertShape::from_code)
                        .unwrap_or_default();
                }
                "CULVERTMATERIAL" => {
                    barrel.material = first_int(value)
                        .and_then(CulvertMaterial::from_code)
                        .unwrap_or_default();
                }
                "INLETTYPE" => {
                    barrel.inlet_type = first_int(value)
                        .and_then(InletType::from_code)
                        .unwrap_or_default();
                }
                "INLETEDGETYPE" => {
                    barrel.inlet_edge_type = first_int(value)
                        .and_then(InletEdgeType::from_code)
                        .unwrap_or_default();
                }
                "INLETEDGETYPE71" => {
                    barrel.inlet_edge_type71 = first_int(value)
                        .and_then(InletEdgeType71::from_code)
                        .unwrap_or_default();
                }
                "IMPINLETEDGETYPE" => {
                    barrel.improved_inlet_edge_type = first_int(value)
                        .and_then(ImprovedInletEdgeType::from_code)
                        .unwrap_or_default();
                }
                "BARRELDATA" => {
                    if let [span, rise, top, bottom] = floats(value, 4)[..] {
                        barrel.span = self.length(span);
                        barrel.rise = self.length(rise);
                        manning = Some(ManningPair { top, bottom });
                    }
                }
                "NUMBEROFBARRELS" => {
                    barrel.number_of_barrels = first_int(value).unwrap_or(barrel.number_of_barrels);
                }
                "INVERTDATA" => {
                    if let [s_in, e_in, s_out, e_out] = floats(value, 4)[..] {
                        barrel.inlet_invert_station = self.length(s_in);
                        barrel.inlet_invert_elevation = self.length(e_in);
                        barrel.outlet_invert_station = self.length(s_out);
                        barrel.outlet_invert_elevation = self.length(e_out);
                    }
                }
                "ROADCULVSTATION" => {
                    if let Some(station) = first_float(value) {
                        barrel.roadway_station = self.length(station);
                    }
                }
                "BARRELSPACING" => {
                    barrel.barrel_spacing = first_float(value).map(|v| self.length(v));
                }
                "STARTCULVNOTES" => {
                    barrel.notes = self.notes(value, "ENDCULVNOTES")?;
                }
                _ => {}
            }
        }

        // Values identical to what the encoder derives were never set explicitly.
        barrel.manning = manning.filter(|pair| {
            let derived = ManningPair::for_material(barrel.material);
            !(is_derived(pair.top, derived.top) && is_derived(pair.bottom, derived.bottom))
        });
        if let Some(spacing) = barrel.barrel_spacing
            && is_derived(spacing, barrel.derived_spacing())
        {
            barrel.barrel_spacing = None;
        }
        Ok(barrel)
    }
}
