//! JSON configuration documents.
//!
//! The configuration format is friendlier than the canonical model: enums are
//! written by name, flows are flat, and the tailwater only accepts the
//! constant-elevation fields. [`project_from_config`] turns it into a
//! [`Project`]; it does not run invariant validation.

use std::collections::BTreeMap;
use std::path::Path;

use cf_core::UnitSystem;
use serde::Deserialize;

use crate::codes::{
    CulvertMaterial, CulvertShape, FlowMethod, ImprovedInletEdgeType, InletEdgeType,
    InletEdgeType71, InletType, RoadwaySurface, TailwaterType,
};
use crate::schema::{Barrel, Crossing, Flow, ManningPair, Project, Roadway, Tailwater};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Unsupported {what} '{value}'")]
    UnknownName { what: &'static str, value: String },

    #[error("Unsupported flow method '{value}'")]
    UnsupportedFlowMethod { value: String },

    #[error("Tailwater type '{value}' is not supported. Configure a constant elevation.")]
    UnsupportedTailwater { value: String },

    #[error("Tailwater fields ({fields}) are not supported. Configure a constant elevation.")]
    UnsupportedTailwaterFields { fields: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub crossings: Vec<CrossingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub title: String,
    pub designer: String,
    pub notes: String,
    pub units: Option<String>,
    pub exit_loss_option: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    pub name: Option<String>,
    pub notes: String,
    pub uuid: Option<String>,
    pub flow: FlowConfig,
    pub tailwater: TailwaterConfig,
    pub roadway: RoadwayConfig,
    pub culverts: Vec<CulvertConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub method: Option<String>,
    pub minimum: f64,
    pub design: f64,
    pub maximum: f64,
    pub user_values: Vec<f64>,
    pub user_value_labels: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TailwaterConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub constant_elevation: f64,
    pub invert_elevation: f64,
    /// Channel geometry keys are captured only to be rejected.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RoadwayConfig {
    pub width: f64,
    pub shape: i64,
    pub surface: Option<String>,
    pub stations: Vec<f64>,
    pub elevations: Vec<f64>,
}

impl Default for RoadwayConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            shape: 1,
            surface: None,
            stations: Vec::new(),
            elevations: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CulvertConfig {
    pub name: Option<String>,
    pub span: f64,
    pub rise: f64,
    pub shape: Option<String>,
    pub material: Option<String>,
    pub number_of_barrels: i64,
    pub inlet_invert_station: f64,
    pub inlet_invert_elevation: f64,
    pub outlet_invert_station: f64,
    pub outlet_invert_elevation: f64,
    pub roadway_station: f64,
    pub barrel_spacing: Option<f64>,
    pub manning_n_top: Option<f64>,
    pub manning_n_bottom: Option<f64>,
    pub inlet_type: Option<String>,
    pub inlet_edge_type: Option<String>,
    pub inlet_edge_type71: Option<String>,
    pub improved_inlet_edge_type: Option<String>,
    pub notes: String,
}

impl Default for CulvertConfig {
    fn default() -> Self {
        Self {
            name: None,
            span: 0.0,
            rise: 0.0,
            shape: None,
            material: None,
            number_of_barrels: 1,
            inlet_invert_station: 0.0,
            inlet_invert_elevation: 0.0,
            outlet_invert_station: 0.0,
            outlet_invert_elevation: 0.0,
            roadway_station: 0.0,
            barrel_spacing: None,
            manning_n_top: None,
            manning_n_bottom: None,
            inlet_type: None,
            inlet_edge_type: None,
            inlet_edge_type71: None,
            improved_inlet_edge_type: None,
            notes: String::new(),
        }
    }
}

const REJECTED_TAILWATER_FIELDS: [&str; 4] =
    ["bottom_width", "channel_slope", "manning_n", "rating_curve"];

fn named<T>(
    value: Option<&str>,
    what: &'static str,
    parse: impl Fn(&str) -> Option<T>,
    default: T,
) -> ConfigResult<T> {
    match value {
        None => Ok(default),
        Some(text) => parse(text).ok_or_else(|| ConfigError::UnknownName {
            what,
            value: text.to_string(),
        }),
    }
}

fn required(value: Option<String>, field: &str, context: String) -> ConfigResult<String> {
    value.ok_or_else(|| ConfigError::MissingField {
        field: field.to_string(),
        context,
    })
}

impl FlowConfig {
    fn into_flow(self) -> ConfigResult<Flow> {
        let method = match self.method.as_deref() {
            None => FlowMethod::MinDesignMax,
            Some(text) => FlowMethod::from_name(text).ok_or_else(|| {
                ConfigError::UnsupportedFlowMethod {
                    value: text.to_string(),
                }
            })?,
        };
        Ok(match method {
            FlowMethod::MinDesignMax => {
                Flow::min_design_max(self.minimum, self.design, self.maximum)
            }
            FlowMethod::UserDefined => Flow::labelled(self.user_values, self.user_value_labels),
        })
    }
}

impl TailwaterConfig {
    fn into_tailwater(self) -> ConfigResult<Tailwater> {
        if let Some(text) = self.kind.as_deref() {
            let kind = TailwaterType::from_name(text).ok_or_else(|| ConfigError::UnknownName {
                what: "tailwater type",
                value: text.to_string(),
            })?;
            if kind != TailwaterType::Constant {
                return Err(ConfigError::UnsupportedTailwater {
                    value: kind.label().to_string(),
                });
            }
        }
        let rejected: Vec<&str> = REJECTED_TAILWATER_FIELDS
            .iter()
            .copied()
            .filter(|field| self.extra.contains_key(*field))
            .collect();
        if !rejected.is_empty() {
            return Err(ConfigError::UnsupportedTailwaterFields {
                fields: rejected.join(", "),
            });
        }
        Ok(Tailwater::constant(
            self.constant_elevation,
            self.invert_elevation,
        ))
    }
}

impl RoadwayConfig {
    fn into_roadway(self, crossing: &str) -> ConfigResult<Roadway> {
        let surface_name = required(
            self.surface,
            "surface",
            format!("roadway of crossing '{crossing}' (paved, gravel, user_defined)"),
        )?;
        let surface = named(
            Some(surface_name.as_str()),
            "roadway surface",
            RoadwaySurface::from_name,
            RoadwaySurface::Paved,
        )?;
        Ok(Roadway {
            width: self.width,
            shape: self.shape,
            surface,
            stations: self.stations,
            elevations: self.elevations,
        })
    }
}

impl CulvertConfig {
    fn into_barrel(self, crossing: &str) -> ConfigResult<Barrel> {
        let name = required(self.name, "name", format!("culvert in crossing '{crossing}'"))?;
        let material = named(
            self.material.as_deref(),
            "culvert material",
            CulvertMaterial::from_name,
            CulvertMaterial::Concrete,
        )?;
        let manning = match (self.manning_n_top, self.manning_n_bottom) {
            (None, None) => None,
            (top, bottom) => {
                let derived = ManningPair::for_material(material);
                Some(ManningPair {
                    top: top.unwrap_or(derived.top),
                    bottom: bottom.unwrap_or(derived.bottom),
                })
            }
        };
        Ok(Barrel {
            name,
            shape: named(
                self.shape.as_deref(),
                "culvert shape",
                CulvertShape::from_name,
                CulvertShape::Circle,
            )?,
            material,
            span: self.span,
            rise: self.rise,
            number_of_barrels: self.number_of_barrels,
            inlet_invert_station: self.inlet_invert_station,
            inlet_invert_elevation: self.inlet_invert_elevation,
            outlet_invert_station: self.outlet_invert_station,
            outlet_invert_elevation: self.outlet_invert_elevation,
            roadway_station: self.roadway_station,
            inlet_type: named(
                self.inlet_type.as_deref(),
                "inlet type",
                InletType::from_name,
                InletType::default(),
            )?,
            inlet_edge_type: named(
                self.inlet_edge_type.as_deref(),
                "inlet edge type",
                InletEdgeType::from_name,
                InletEdgeType::default(),
            )?,
            inlet_edge_type71: named(
                self.inlet_edge_type71.as_deref(),
                "legacy inlet edge type",
                InletEdgeType71::from_name,
                InletEdgeType71::default(),
            )?,
            improved_inlet_edge_type: named(
                self.improved_inlet_edge_type.as_deref(),
                "improved inlet edge type",
                ImprovedInletEdgeType::from_name,
                ImprovedInletEdgeType::default(),
            )?,
            manning,
            barrel_spacing: self.barrel_spacing,
            notes: self.notes,
        })
    }
}

impl CrossingConfig {
    fn into_crossing(self) -> ConfigResult<Crossing> {
        let name = required(self.name, "name", "crossing".to_string())?;
        let barrels = self
            .culverts
            .into_iter()
            .map(|c| c.into_barrel(&name))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Crossing {
            notes: self.notes,
            flow: self.flow.into_flow()?,
            tailwater: self.tailwater.into_tailwater()?,
            roadway: self.roadway.into_roadway(&name)?,
            barrels,
            guid: self.uuid,
            name,
        })
    }
}

pub fn project_from_config(config: ProjectConfig) -> ConfigResult<Project> {
    let units = named(
        config.project.units.as_deref(),
        "unit system",
        |text| text.parse::<UnitSystem>().ok(),
        UnitSystem::English,
    )?;
    let crossings = config
        .crossings
        .into_iter()
        .map(CrossingConfig::into_crossing)
        .collect::<ConfigResult<Vec<_>>>()?;
    Ok(Project {
        title: config.project.title,
        designer: config.project.designer,
        notes: config.project.notes,
        units,
        exit_loss_option: config.project.exit_loss_option,
        crossings,
    })
}

pub fn project_from_json_str(text: &str) -> ConfigResult<Project> {
    let config: ProjectConfig = serde_json::from_str(text)?;
    project_from_config(config)
}

pub fn load_config(path: &Path) -> ConfigResult<Project> {
    let text = std::fs::read_to_string(path)?;
    let project = project_from_json_str(&text)?;
    tracing::info!(
        path = %path.display(),
        crossings = project.crossings.len(),
        "loaded project configuration"
    );
    Ok(project)
}
