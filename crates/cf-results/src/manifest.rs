//! Evaluation journal written next to kept scratch files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ResultsError, ResultsResult};

pub const MANIFEST_FILE: &str = "manifest.json";

/// SHA-256 of the project text handed to the solver, lowercase hex.
pub fn digest_project_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub index: usize,
    pub flow: f64,
    /// `None` when the solver reported no usable headwater.
    pub headwater: Option<f64>,
    pub project_file: String,
    pub digest: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchManifest {
    pub crossing: String,
    pub created: String,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
}

impl SearchManifest {
    pub fn new(crossing: impl Into<String>) -> Self {
        Self {
            crossing: crossing.into(),
            created: timestamp_now(),
            evaluations: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        flow: f64,
        headwater: f64,
        project_file: &Path,
        project_text: &str,
    ) -> &EvaluationRecord {
        let record = EvaluationRecord {
            index: self.evaluations.len() + 1,
            flow,
            headwater: headwater.is_finite().then_some(headwater),
            project_file: project_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            digest: digest_project_text(project_text),
            timestamp: timestamp_now(),
        };
        self.evaluations.push(record);
        &self.evaluations[self.evaluations.len() - 1]
    }
}

pub fn save_manifest(dir: &Path, manifest: &SearchManifest) -> ResultsResult<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(())
}

pub fn load_manifest(dir: &Path) -> ResultsResult<SearchManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(ResultsError::ManifestNotFound { path });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
