//! Project loading, saving, validation, and introspection.

use std::path::{Path, PathBuf};

use cf_codec::{EncodeOptions, PROJECT_EXTENSION, write_project};
use cf_core::UnitSystem;
use cf_project::{
    Barrel, Crossing, Flow, Project, Roadway, RoadwaySurface, Tailwater, collect_problems,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Summary of a crossing for listing.
#[derive(Debug, Clone, Serialize)]
pub struct CrossingSummary {
    pub name: String,
    pub flow_method: String,
    pub flows: Vec<f64>,
    pub barrels: usize,
    pub tailwater_elevation: f64,
    pub crest_elevation: Option<f64>,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Load a project by file extension: solver project files, YAML or JSON.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::MissingProjectFile {
            path: path.to_path_buf(),
        });
    }
    let project = match extension(path).as_str() {
        PROJECT_EXTENSION => cf_codec::read_project(path)?,
        "yaml" | "yml" => cf_project::load_yaml(path)?,
        "json" => cf_project::load_json(path)?,
        other => {
            return Err(AppError::InvalidInput(format!(
                "unrecognised project file extension '{other}' for {}",
                path.display()
            )));
        }
    };
    Ok(project)
}

/// Build a project from a JSON configuration document.
pub fn load_config_project(path: &Path) -> AppResult<Project> {
    Ok(cf_project::load_config_validated(path)?)
}

/// Save by extension; solver project files refuse to overwrite unless asked.
pub fn save_project(path: &Path, project: &Project, overwrite: bool) -> AppResult<PathBuf> {
    match extension(path).as_str() {
        "yaml" | "yml" => {
            cf_project::save_yaml(path, project)?;
            Ok(path.to_path_buf())
        }
        "json" => {
            cf_project::save_json(path, project)?;
            Ok(path.to_path_buf())
        }
        _ => Ok(write_project(
            path,
            project,
            &EncodeOptions::default(),
            overwrite,
        )?),
    }
}

/// Every validation problem, empty when the project is valid.
pub fn validate_project(project: &Project) -> Vec<String> {
    collect_problems(project)
}

pub fn list_crossings(project: &Project) -> Vec<CrossingSummary> {
    project
        .crossings
        .iter()
        .map(|crossing| CrossingSummary {
            name: crossing.name.clone(),
            flow_method: crossing.flow.method().label().to_string(),
            flows: crossing.flow.sequence(),
            barrels: crossing.total_barrels(),
            tailwater_elevation: crossing.tailwater.constant_elevation,
            crest_elevation: crossing.roadway.crest_elevation(),
        })
        .collect()
}

pub fn get_crossing<'a>(project: &'a Project, name: &str) -> AppResult<&'a Crossing> {
    project.crossing(name).ok_or_else(|| AppError::CrossingNotFound {
        name: name.to_string(),
        what: format!("project '{}'", project.display_title()),
    })
}

/// Small single-crossing project: three user flows, a constant tailwater and
/// one 4 ft circular barrel under a 40 ft paved roadway.
pub fn demo_project(units: UnitSystem) -> Project {
    let mut project = Project::new("Demo crossing", units);
    project.designer = "culvertflow".to_string();
    let mut crossing = Crossing::new("Demo Culvert");
    crossing.flow = Flow::user_defined(vec![5.0, 10.0, 15.0]);
    crossing.tailwater = Tailwater::constant(100.5, 99.0);
    let mut roadway = Roadway::new(40.0, RoadwaySurface::Paved);
    roadway
        .add_point(0.0, 102.0)
        .add_point(50.0, 101.5)
        .add_point(100.0, 102.0);
    crossing.roadway = roadway;
    crossing.add_barrel(Barrel::circle("Barrel 1", 4.0).with_inverts(99.0, 98.5));
    project.add_crossing(crossing);
    project
}
