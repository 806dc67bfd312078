//! cf-results: solver report parsing and evaluation journals.

pub mod detail;
pub mod manifest;
pub mod summary;
pub mod types;

pub use detail::{parse_detail, read_detail};
pub use manifest::{EvaluationRecord, SearchManifest, digest_project_text, load_manifest, save_manifest};
pub use summary::{parse_summary, read_summary};
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report not found: {}", .path.display())]
    MissingReport { path: PathBuf },

    #[error("Manifest not found: {}", .path.display())]
    ManifestNotFound { path: PathBuf },
}
