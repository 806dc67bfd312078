//! Scratch directories for solver runs.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::AppResult;

const TEMP_PREFIX: &str = "culvertflow-";

/// Directory holding scratch project files and solver outputs.
///
/// Auto-created workspaces are removed on drop unless kept; caller-supplied
/// directories are never removed.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl ScratchWorkspace {
    pub fn prepare(base: Option<&Path>, keep_files: bool) -> AppResult<Self> {
        if let Some(dir) = base {
            fs::create_dir_all(dir)?;
            debug!(path = %dir.display(), "reusing workspace directory");
            return Ok(Self {
                path: dir.to_path_buf(),
                temp: None,
            });
        }

        let temp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
        if keep_files {
            let path = temp.keep();
            debug!(path = %path.display(), "created kept workspace");
            return Ok(Self { path, temp: None });
        }
        debug!(path = %temp.path().display(), "created temporary workspace");
        Ok(Self {
            path: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` when the directory outlives this value.
    pub fn is_retained(&self) -> bool {
        self.temp.is_none()
    }

    /// Per-crossing sub-directory `crossing_NNN` (1-based).
    pub fn child(&self, index: usize) -> AppResult<PathBuf> {
        let dir = self.path.join(format!("crossing_{index:03}"));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };
        debug!(path = %self.path.display(), "removing temporary workspace");
        if let Err(e) = temp.close() {
            warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
        }
    }
}

/// File-system friendly form of a crossing name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "crossing".to_string()
    } else {
        cleaned
    }
}
