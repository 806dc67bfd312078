//! Error types for the cf-app service layer.

use std::path::PathBuf;

/// Application error folding the backend crates' errors into one type for
/// the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(#[from] cf_project::ProjectError),

    #[error("Project validation failed:\n{}", .problems.join("\n"))]
    Validation { problems: Vec<String> },

    #[error("Project file error: {0}")]
    Codec(#[from] cf_codec::CodecError),

    #[error("Results error: {0}")]
    Results(#[from] cf_results::ResultsError),

    #[error("Search error: {0}")]
    Solver(#[from] cf_solver::SolverError),

    #[error(
        "Solver failed on {} (exit code {}): {message}\nstdout:\n{stdout_tail}\nstderr:\n{stderr_tail}",
        .path.display(),
        .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    SolverInvocation {
        path: PathBuf,
        exit_code: Option<i32>,
        message: String,
        stdout_tail: String,
        stderr_tail: String,
    },

    #[error("Solver executable not found: {}", .path.display())]
    ExecutableNotFound { path: PathBuf },

    #[error("Project file not found: {}", .path.display())]
    MissingProjectFile { path: PathBuf },

    #[error("Crossing '{name}' not found in {what}")]
    CrossingNotFound { name: String, what: String },

    #[error("Solver output for crossing '{crossing}' has no usable flow rows")]
    NoValidRows { crossing: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<cf_project::ValidationError> for AppError {
    fn from(err: cf_project::ValidationError) -> Self {
        AppError::Validation {
            problems: err.problems(),
        }
    }
}
