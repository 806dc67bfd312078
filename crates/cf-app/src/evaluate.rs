//! One solver run per trial flow on a scratch copy of a crossing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cf_codec::{EncodeOptions, PROJECT_EXTENSION, encode_with};
use cf_project::{Crossing, Flow, Project};
use cf_results::{
    ResultRow, ResultTable, SearchManifest, read_detail, read_summary, save_manifest,
};
use cf_solver::Evaluator;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::executor::{SolverInvoker, SolverSwitch, invocation_error, run_checked};
use crate::workspace::sanitize_name;

const SUMMARY_EXTENSION: &str = "rst";
const DETAIL_EXTENSION: &str = "rsql";

/// Reports left by an earlier run in a reused directory must not be read as
/// this run's output.
fn remove_stale_reports(file: &Path) -> AppResult<()> {
    for extension in [SUMMARY_EXTENSION, DETAIL_EXTENSION] {
        let path = file.with_extension(extension);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale report"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Evaluates trial flows for one crossing.
///
/// Each call writes `<crossing>_run_<NNN>.hy8` into `dir`, runs the solver on
/// it and returns the report row nearest the trial flow. The caller's project
/// is never touched; trial flows go into a private snapshot.
pub struct CrossingEvaluator<'a> {
    invoker: &'a dyn SolverInvoker,
    snapshot: Project,
    dir: PathBuf,
    file_stem: String,
    runs: usize,
    options: EncodeOptions,
    journal: Option<SearchManifest>,
}

impl<'a> CrossingEvaluator<'a> {
    pub fn new(invoker: &'a dyn SolverInvoker, snapshot: Project, dir: &Path) -> AppResult<Self> {
        let Some(crossing) = snapshot.crossings.first() else {
            return Err(AppError::InvalidInput(
                "scratch project must contain one crossing".to_string(),
            ));
        };
        let file_stem = sanitize_name(&crossing.name);
        Ok(Self {
            invoker,
            dir: dir.to_path_buf(),
            file_stem,
            runs: 0,
            options: EncodeOptions::default(),
            journal: None,
            snapshot,
        })
    }

    /// Record every evaluation in `manifest.json` inside the run directory.
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(SearchManifest::new(self.crossing().name.clone()));
        self
    }

    pub fn crossing(&self) -> &Crossing {
        &self.snapshot.crossings[0]
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn journal(&self) -> Option<&SearchManifest> {
        self.journal.as_ref()
    }

    fn scratch_file(&self) -> PathBuf {
        self.dir.join(format!(
            "{}_run_{:03}.{PROJECT_EXTENSION}",
            self.file_stem, self.runs
        ))
    }

    fn run_once(&mut self, flow: f64) -> AppResult<ResultRow> {
        self.runs += 1;
        self.snapshot.crossings[0].flow = Flow::user_defined(vec![flow]);
        let text = encode_with(&self.snapshot, &self.options)?;
        let file = self.scratch_file();
        fs::write(&file, &text)?;
        remove_stale_reports(&file)?;
        info!(
            crossing = %self.crossing().name,
            run = self.runs,
            flow,
            file = %file.display(),
            "running solver"
        );

        let output = run_checked(self.invoker, &file, &SolverSwitch::OpenRunSave)?;
        let summary_path = file.with_extension(SUMMARY_EXTENSION);
        if !summary_path.exists() {
            return Err(invocation_error(
                &file,
                &output,
                format!("summary report {} was not produced", summary_path.display()),
            ));
        }
        let name = self.crossing().name.clone();
        let mut summary = read_summary(&summary_path)?;
        let Some(series) = summary.remove(&name) else {
            return Err(AppError::CrossingNotFound {
                name,
                what: summary_path.display().to_string(),
            });
        };
        let mut detail = read_detail(&file.with_extension(DETAIL_EXTENSION))?;
        let profiles = detail.remove(&name).unwrap_or_default();
        let table = ResultTable::merge(&series, &profiles);
        let row = table
            .nearest(flow)
            .cloned()
            .ok_or(AppError::NoValidRows { crossing: name })?;
        debug!(flow = row.flow, headwater = row.headwater_elevation, "selected result row");

        if let Some(journal) = self.journal.as_mut() {
            journal.record(flow, row.headwater_elevation, &file, &text);
            save_manifest(&self.dir, journal)?;
        }
        Ok(row)
    }
}

impl Evaluator for CrossingEvaluator<'_> {
    type Error = AppError;

    fn evaluate(&mut self, flow: f64) -> AppResult<ResultRow> {
        self.run_once(flow)
    }
}
