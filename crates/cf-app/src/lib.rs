//! Shared application service layer for culvertflow.
//!
//! Wires the project file codec, the external solver process and the search
//! engine together for the CLI: project loading and saving, solver discovery,
//! scratch workspaces and headwater/discharge queries.

pub mod error;
pub mod evaluate;
pub mod executor;
pub mod hydraulics_service;
pub mod project_service;
pub mod workspace;

pub use error::{AppError, AppResult};
pub use evaluate::CrossingEvaluator;
pub use executor::{
    PATH_FILE_NAME, ProcessOutput, SolverExecutable, SolverInvoker, SolverSwitch,
    default_path_file, persist_executable_path, resolve_executable_path, run_checked,
};
pub use hydraulics_service::{
    CrossingResult, HydraulicQuery, RunOptions, run_crossing_query, run_project_query,
};
pub use project_service::{
    CrossingSummary, demo_project, get_crossing, list_crossings, load_config_project,
    load_project, save_project, validate_project,
};
pub use workspace::{ScratchWorkspace, sanitize_name};
