//! cf-codec: reader and writer for the solver's card-based project file.

pub mod cards;
pub mod columns;
pub mod decode;
pub mod encode;
pub mod error;

pub use columns::{CARD_COLUMN, CardValue, format_card};
pub use decode::{decode, detect_increment};
pub use encode::{EncodeOptions, encode, encode_with, written_flows};
pub use error::{CodecError, CodecResult};

use std::path::{Path, PathBuf};

use cf_project::Project;

pub const PROJECT_EXTENSION: &str = "hy8";

pub fn read_project(path: &Path) -> CodecResult<Project> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let project = decode(&text)?;
    tracing::info!(path = %path.display(), crossings = project.crossings.len(), "read project file");
    Ok(project)
}

/// Encode and write `project`, forcing the project file extension. Returns
/// the path actually written.
pub fn write_project(
    path: &Path,
    project: &Project,
    options: &EncodeOptions,
    overwrite: bool,
) -> CodecResult<PathBuf> {
    let target = path.with_extension(PROJECT_EXTENSION);
    let text = encode_with(project, options)?;
    if target.exists() && !overwrite {
        return Err(CodecError::AlreadyExists { path: target });
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, text)?;
    tracing::info!(path = %target.display(), "wrote project file");
    Ok(target)
}
