//! External solver invocation and executable discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use cf_codec::PROJECT_EXTENSION;
use cf_core::UnitSystem;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

pub const PATH_FILE_NAME: &str = "HY8_PATH.txt";
pub const DEFAULT_INSTALL_PATH: &str = r"C:\Program Files\HY-8 8.00\HY864.exe";
/// Checked in order before the path file.
pub const EXECUTABLE_ENV_VARS: [&str; 2] = ["HY8_EXE", "HY8_EXECUTABLE"];

const TAIL_LINES: usize = 20;

/// Automation switch passed ahead of the project file.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverSwitch {
    OpenRunSave,
    OpenRunSavePlots,
    BuildFullReport,
    BuildFlowTwTable {
        flow_coef: f64,
        flow_const: f64,
        units: UnitSystem,
        hw_increment: f64,
        tw_increment: f64,
    },
    BuildHwTwTable {
        units: UnitSystem,
        hw_increment: f64,
        tw_increment: f64,
    },
}

impl SolverSwitch {
    pub fn flow_tw_table() -> Self {
        SolverSwitch::BuildFlowTwTable {
            flow_coef: 1.1,
            flow_const: 0.25,
            units: UnitSystem::English,
            hw_increment: 0.25,
            tw_increment: 0.25,
        }
    }

    pub fn hw_tw_table() -> Self {
        SolverSwitch::BuildHwTwTable {
            units: UnitSystem::English,
            hw_increment: 0.25,
            tw_increment: 0.25,
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            SolverSwitch::OpenRunSave => vec!["-OpenRunSave".into()],
            SolverSwitch::OpenRunSavePlots => vec!["-OpenRunSavePlots".into()],
            SolverSwitch::BuildFullReport => vec!["-BuildFullReport".into()],
            SolverSwitch::BuildFlowTwTable {
                flow_coef,
                flow_const,
                units,
                hw_increment,
                tw_increment,
            } => vec![
                "-BuildFlowTwTable".into(),
                "FLOWCOEF".into(),
                flow_coef.to_string(),
                "FLOWCONST".into(),
                flow_const.to_string(),
                "UNITS".into(),
                units.cli_flag().into(),
                "HWINC".into(),
                hw_increment.to_string(),
                "TWINC".into(),
                tw_increment.to_string(),
            ],
            SolverSwitch::BuildHwTwTable {
                units,
                hw_increment,
                tw_increment,
            } => vec![
                "-BuildHwTwTable".into(),
                "UNITS".into(),
                units.cli_flag().into(),
                "HWINC".into(),
                hw_increment.to_string(),
                "TWINC".into(),
                tw_increment.to_string(),
            ],
        }
    }
}

/// Captured result of one solver process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the external solver on a project file. Tests substitute fakes.
pub trait SolverInvoker: Send + Sync {
    fn invoke(&self, project_file: &Path, switch: &SolverSwitch) -> AppResult<ProcessOutput>;
}

fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(TAIL_LINES);
    lines[start..].join("\n")
}

pub(crate) fn invocation_error(
    path: &Path,
    output: &ProcessOutput,
    message: impl Into<String>,
) -> AppError {
    AppError::SolverInvocation {
        path: path.to_path_buf(),
        exit_code: output.exit_code,
        message: message.into(),
        stdout_tail: tail(&output.stdout),
        stderr_tail: tail(&output.stderr),
    }
}

/// Invoke the solver and turn a non-zero exit into an error.
pub fn run_checked(
    invoker: &dyn SolverInvoker,
    project_file: &Path,
    switch: &SolverSwitch,
) -> AppResult<ProcessOutput> {
    let project_file = project_file.with_extension(PROJECT_EXTENSION);
    if !project_file.exists() {
        return Err(AppError::MissingProjectFile { path: project_file });
    }
    let output = invoker.invoke(&project_file, switch)?;
    if !output.success() {
        warn!(path = %project_file.display(), exit_code = ?output.exit_code, "solver reported failure");
        return Err(invocation_error(&project_file, &output, "non-zero exit status"));
    }
    Ok(output)
}

/// Path to a solver binary, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverExecutable {
    path: PathBuf,
}

impl SolverExecutable {
    /// Wrap `path` after checking that it exists.
    pub fn new(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(AppError::ExecutableNotFound { path });
        }
        Ok(Self { path })
    }

    /// Resolve from the process environment and the path file in the working directory.
    pub fn locate(explicit: Option<&Path>) -> AppResult<Self> {
        let path = resolve_executable_path(
            explicit,
            |key| std::env::var(key).ok(),
            &default_path_file(),
        );
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run(&self, project_file: &Path, switch: &SolverSwitch) -> AppResult<ProcessOutput> {
        run_checked(self, project_file, switch)
    }
}

impl SolverInvoker for SolverExecutable {
    fn invoke(&self, project_file: &Path, switch: &SolverSwitch) -> AppResult<ProcessOutput> {
        let args = switch.args();
        info!(exe = %self.path.display(), ?args, project = %project_file.display(), "invoking solver");
        let output = Command::new(&self.path)
            .args(&args)
            .arg(project_file)
            .output()
            .map_err(|e| AppError::SolverInvocation {
                path: project_file.to_path_buf(),
                exit_code: None,
                message: format!("failed to start {}: {e}", self.path.display()),
                stdout_tail: String::new(),
                stderr_tail: String::new(),
            })?;
        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(exit_code = ?result.exit_code, "solver finished");
        Ok(result)
    }
}

pub fn default_path_file() -> PathBuf {
    PathBuf::from(PATH_FILE_NAME)
}

/// One-line path file, surrounding quotes stripped. `None` when missing or blank.
pub fn read_path_file(path_file: &Path) -> Option<PathBuf> {
    let text = fs::read_to_string(path_file).ok()?;
    let text = text.trim().trim_matches('"').trim();
    (!text.is_empty()).then(|| PathBuf::from(text))
}

/// Store `executable` in the path file and return the file written.
pub fn persist_executable_path(path_file: &Path, executable: &Path) -> AppResult<PathBuf> {
    if let Some(parent) = path_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path_file, executable.to_string_lossy().as_bytes())?;
    info!(path_file = %path_file.display(), exe = %executable.display(), "saved solver path");
    Ok(path_file.to_path_buf())
}

/// Explicit path, then environment variables, then the path file, then the
/// default install location.
pub fn resolve_executable_path(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    path_file: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    for key in EXECUTABLE_ENV_VARS {
        if let Some(value) = env(key).filter(|v| !v.trim().is_empty()) {
            debug!(var = key, "solver path from environment");
            return PathBuf::from(value.trim());
        }
    }
    if let Some(path) = read_path_file(path_file) {
        debug!(path_file = %path_file.display(), "solver path from path file");
        return path;
    }
    PathBuf::from(DEFAULT_INSTALL_PATH)
}
