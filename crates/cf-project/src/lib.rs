//! cf-project: culvert crossing data model, configuration documents and validation.

pub mod codes;
pub mod config;
pub mod schema;
pub mod validate;

pub use codes::*;
pub use config::{ConfigError, ProjectConfig, load_config, project_from_json_str};
pub use schema::*;
pub use validate::{Validate, ValidationError, check_supported, collect_problems, validate_project};

use std::fs;
use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Project validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Project file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed YAML project: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed JSON project: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ModelFormat {
    Yaml,
    Json,
}

fn read_model(path: &Path, format: ModelFormat) -> ProjectResult<Project> {
    let text = fs::read_to_string(path)?;
    let project: Project = match format {
        ModelFormat::Yaml => serde_yaml::from_str(&text)?,
        ModelFormat::Json => serde_json::from_str(&text)?,
    };
    validate_project(&project)?;
    Ok(project)
}

/// The model is validated before anything is written.
fn write_model(path: &Path, project: &Project, format: ModelFormat) -> ProjectResult<()> {
    validate_project(project)?;
    let text = match format {
        ModelFormat::Yaml => serde_yaml::to_string(project)?,
        ModelFormat::Json => serde_json::to_string_pretty(project)?,
    };
    fs::write(path, text)?;
    Ok(())
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    read_model(path, ModelFormat::Yaml)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    write_model(path, project, ModelFormat::Yaml)
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    read_model(path, ModelFormat::Json)
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    write_model(path, project, ModelFormat::Json)
}

/// Load a JSON configuration document and validate the resulting project.
pub fn load_config_validated(path: &Path) -> ProjectResult<Project> {
    let project = load_config(path)?;
    check_supported(&project)?;
    validate_project(&project)?;
    Ok(project)
}
