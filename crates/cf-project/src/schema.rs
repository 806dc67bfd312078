//! Project schema definitions.
//!
//! All lengths, elevations and discharges are held in the project's declared
//! unit system. Conversion to the solver's native units happens in the codec.

use cf_core::UnitSystem;
use serde::{Deserialize, Serialize};

use crate::codes::{
    CulvertMaterial, CulvertShape, FlowMethod, ImprovedInletEdgeType, InletEdgeType,
    InletEdgeType71, InletType, RoadwaySurface, TailwaterType,
};

/// Label attached to the point synthesized for single-value flow lists.
pub const SYNTHETIC_FLOW_LABEL: &str = "dummy flow";

/// Manning roughness assumed for corrugated steel barrels.
pub const CORRUGATED_STEEL_MANNING_N: f64 = 0.024;
/// Manning roughness assumed for every other barrel material.
pub const SMOOTH_MANNING_N: f64 = 0.012;
/// Default barrel spacing is this multiple of the span.
pub const DEFAULT_SPACING_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub designer: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub units: UnitSystem,
    #[serde(default)]
    pub exit_loss_option: i64,
    #[serde(default)]
    pub crossings: Vec<Crossing>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            title: String::new(),
            designer: String::new(),
            notes: String::new(),
            units: UnitSystem::default(),
            exit_loss_option: 0,
            crossings: Vec::new(),
        }
    }
}

impl Project {
    pub fn new(title: impl Into<String>, units: UnitSystem) -> Self {
        Self {
            title: title.into(),
            units,
            ..Self::default()
        }
    }

    pub fn add_crossing(&mut self, crossing: Crossing) -> &mut Crossing {
        tracing::debug!(
            crossing = %crossing.name,
            project = %self.display_title(),
            "added crossing"
        );
        self.crossings.push(crossing);
        let last = self.crossings.len() - 1;
        &mut self.crossings[last]
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "<untitled>"
        } else {
            &self.title
        }
    }

    pub fn crossing(&self, name: &str) -> Option<&Crossing> {
        self.crossings.iter().find(|c| c.name == name)
    }

    /// Independent single-crossing project carrying this project's metadata.
    pub fn snapshot_with(&self, crossing: &Crossing) -> Project {
        Project {
            title: self.title.clone(),
            designer: self.designer.clone(),
            notes: self.notes.clone(),
            units: self.units,
            exit_loss_option: self.exit_loss_option,
            crossings: vec![crossing.clone()],
        }
    }

    /// Single-crossing project for a crossing evaluated without a parent.
    pub fn standalone(crossing: &Crossing, units: UnitSystem, exit_loss_option: i64) -> Project {
        Project {
            title: crossing.name.clone(),
            units,
            exit_loss_option,
            crossings: vec![crossing.clone()],
            ..Project::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Crossing {
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub flow: Flow,
    #[serde(default)]
    pub tailwater: Tailwater,
    #[serde(default)]
    pub roadway: Roadway,
    #[serde(default)]
    pub barrels: Vec<Barrel>,
    /// Opaque identifier echoed on round trip. Never generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl Crossing {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: String::new(),
            flow: Flow::default(),
            tailwater: Tailwater::default(),
            roadway: Roadway::default(),
            barrels: Vec::new(),
            guid: None,
        }
    }

    pub fn add_barrel(&mut self, mut barrel: Barrel) -> &mut Barrel {
        if barrel.name.is_empty() {
            barrel.name = format!("Barrel {}", self.barrels.len() + 1);
        }
        tracing::debug!(barrel = %barrel.name, crossing = %self.name, "added barrel");
        self.barrels.push(barrel);
        let last = self.barrels.len() - 1;
        &mut self.barrels[last]
    }

    /// Sum of identical barrel counts; counts below one still contribute one.
    pub fn total_barrels(&self) -> usize {
        let total: usize = self
            .barrels
            .iter()
            .map(|b| usize::try_from(b.number_of_barrels.max(1)).unwrap_or(1))
            .sum();
        total.max(1)
    }
}

/// Discharge definition. Only these two variants exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Flow {
    MinDesignMax {
        minimum: f64,
        design: f64,
        maximum: f64,
    },
    UserDefined {
        #[serde(default)]
        values: Vec<f64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
    },
}

impl Default for Flow {
    fn default() -> Self {
        Flow::UserDefined {
            values: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl Flow {
    pub fn min_design_max(minimum: f64, design: f64, maximum: f64) -> Self {
        Flow::MinDesignMax {
            minimum,
            design,
            maximum,
        }
    }

    pub fn user_defined(values: Vec<f64>) -> Self {
        Flow::UserDefined {
            values,
            labels: Vec::new(),
        }
    }

    pub fn labelled(values: Vec<f64>, labels: Vec<String>) -> Self {
        Flow::UserDefined { values, labels }
    }

    pub fn method(&self) -> FlowMethod {
        match self {
            Flow::MinDesignMax { .. } => FlowMethod::MinDesignMax,
            Flow::UserDefined { .. } => FlowMethod::UserDefined,
        }
    }

    /// Flows in the order they are listed to the solver.
    pub fn sequence(&self) -> Vec<f64> {
        match self {
            Flow::MinDesignMax {
                minimum,
                design,
                maximum,
            } => vec![*minimum, *design, *maximum],
            Flow::UserDefined { values, .. } => values.clone(),
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Flow::MinDesignMax { .. } => &[],
            Flow::UserDefined { labels, .. } => labels,
        }
    }

    /// Append a user-defined flow, switching to the user-defined variant and
    /// keeping labels aligned with values.
    pub fn push_user_flow(&mut self, value: f64, label: Option<&str>) {
        if let Flow::MinDesignMax { .. } = self {
            *self = Flow::default();
        }
        if let Flow::UserDefined { values, labels } = self {
            values.push(value);
            match label {
                Some(text) => {
                    labels.resize(values.len() - 1, String::new());
                    labels.push(text.to_string());
                }
                None if !labels.is_empty() => labels.push(String::new()),
                None => {}
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tailwater {
    pub kind: TailwaterType,
    pub constant_elevation: f64,
    pub invert_elevation: f64,
    pub bottom_width: f64,
    pub sideslope: f64,
    pub channel_slope: f64,
    pub manning_n: f64,
    pub rating_curve_entries: i64,
}

impl Default for Tailwater {
    fn default() -> Self {
        Self {
            kind: TailwaterType::Constant,
            constant_elevation: 0.0,
            invert_elevation: 0.0,
            bottom_width: 0.0,
            sideslope: 1.0,
            channel_slope: 0.0,
            manning_n: 0.0,
            rating_curve_entries: 6,
        }
    }
}

impl Tailwater {
    pub fn constant(elevation: f64, invert: f64) -> Self {
        Self {
            constant_elevation: elevation,
            invert_elevation: invert,
            ..Self::default()
        }
    }

    pub fn is_constant(&self) -> bool {
        self.kind == TailwaterType::Constant
    }

    /// Number of rating-curve rows written to the file.
    pub fn stage_count(&self) -> usize {
        usize::try_from(self.rating_curve_entries.max(1)).unwrap_or(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Roadway {
    pub width: f64,
    pub shape: i64,
    pub surface: RoadwaySurface,
    pub stations: Vec<f64>,
    pub elevations: Vec<f64>,
}

impl Default for Roadway {
    fn default() -> Self {
        Self {
            width: 0.0,
            shape: 1,
            surface: RoadwaySurface::Paved,
            stations: Vec::new(),
            elevations: Vec::new(),
        }
    }
}

impl Roadway {
    pub fn new(width: f64, surface: RoadwaySurface) -> Self {
        Self {
            width,
            surface,
            ..Self::default()
        }
    }

    pub fn add_point(&mut self, station: f64, elevation: f64) -> &mut Self {
        self.stations.push(station);
        self.elevations.push(elevation);
        self
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.stations
            .iter()
            .copied()
            .zip(self.elevations.iter().copied())
    }

    /// Lowest roadway elevation, `None` without samples.
    pub fn crest_elevation(&self) -> Option<f64> {
        self.elevations.iter().copied().reduce(f64::min)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ManningPair {
    pub top: f64,
    pub bottom: f64,
}

impl ManningPair {
    pub fn uniform(n: f64) -> Self {
        Self { top: n, bottom: n }
    }

    pub fn for_material(material: CulvertMaterial) -> Self {
        match material {
            CulvertMaterial::CorrugatedSteel => Self::uniform(CORRUGATED_STEEL_MANNING_N),
            CulvertMaterial::Concrete | CulvertMaterial::Hdpe => Self::uniform(SMOOTH_MANNING_N),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Barrel {
    pub name: String,
    pub shape: CulvertShape,
    pub material: CulvertMaterial,
    pub span: f64,
    pub rise: f64,
    pub number_of_barrels: i64,
    pub inlet_invert_station: f64,
    pub inlet_invert_elevation: f64,
    pub outlet_invert_station: f64,
    pub outlet_invert_elevation: f64,
    pub roadway_station: f64,
    pub inlet_type: InletType,
    pub inlet_edge_type: InletEdgeType,
    pub inlet_edge_type71: InletEdgeType71,
    pub improved_inlet_edge_type: ImprovedInletEdgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manning: Option<ManningPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barrel_spacing: Option<f64>,
    pub notes: String,
}

impl Default for Barrel {
    fn default() -> Self {
        Self {
            name: String::new(),
            shape: CulvertShape::Circle,
            material: CulvertMaterial::Concrete,
            span: 0.0,
            rise: 0.0,
            number_of_barrels: 1,
            inlet_invert_station: 0.0,
            inlet_invert_elevation: 0.0,
            outlet_invert_station: 0.0,
            outlet_invert_elevation: 0.0,
            roadway_station: 0.0,
            inlet_type: InletType::default(),
            inlet_edge_type: InletEdgeType::default(),
            inlet_edge_type71: InletEdgeType71::default(),
            improved_inlet_edge_type: ImprovedInletEdgeType::default(),
            manning: None,
            barrel_spacing: None,
            notes: String::new(),
        }
    }
}

impl Barrel {
    pub fn circle(name: impl Into<String>, diameter: f64) -> Self {
        Self {
            name: name.into(),
            shape: CulvertShape::Circle,
            span: diameter,
            rise: diameter,
            ..Self::default()
        }
    }

    pub fn box_section(name: impl Into<String>, span: f64, rise: f64) -> Self {
        Self {
            name: name.into(),
            shape: CulvertShape::Box,
            span,
            rise,
            ..Self::default()
        }
    }

    pub fn with_inverts(mut self, inlet_elevation: f64, outlet_elevation: f64) -> Self {
        self.inlet_invert_elevation = inlet_elevation;
        self.outlet_invert_elevation = outlet_elevation;
        self
    }

    /// Manning pair written to the file: explicit when set, else by material.
    pub fn manning_values(&self) -> ManningPair {
        self.manning
            .unwrap_or_else(|| ManningPair::for_material(self.material))
    }

    pub fn derived_spacing(&self) -> f64 {
        (self.span * DEFAULT_SPACING_FACTOR).max(0.0)
    }

    pub fn effective_spacing(&self) -> f64 {
        self.barrel_spacing.unwrap_or_else(|| self.derived_spacing())
    }

    /// Material code actually written; boxes are always concrete.
    pub fn written_material(&self) -> CulvertMaterial {
        match self.shape {
            CulvertShape::Box => CulvertMaterial::Concrete,
            CulvertShape::Circle => self.material,
        }
    }
}
