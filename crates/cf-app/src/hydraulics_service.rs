//! Headwater and discharge queries against the external solver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cf_core::UnitSystem;
use cf_project::{Crossing, Project};
use cf_solver::{
    QueryOutcome, SearchConfig, SearchProgressEvent, flow_for_ratio, flow_from_headwater,
    headwater_from_flow,
};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::evaluate::CrossingEvaluator;
use crate::executor::SolverInvoker;
use crate::workspace::ScratchWorkspace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HydraulicQuery {
    HeadwaterFromFlow { flow: f64 },
    FlowFromHeadwater { headwater: f64, hint: Option<f64> },
    FlowForRatio { ratio: f64, hint: Option<f64> },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Scratch directory; a temporary one is created when `None`.
    pub workspace: Option<PathBuf>,
    /// Keep a temporary workspace after the query finishes.
    pub keep_files: bool,
    pub search: SearchConfig,
    /// Worker threads for project batches.
    pub concurrency: usize,
    /// Used only when a crossing is queried without its project.
    pub units: UnitSystem,
    pub exit_loss_option: i64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workspace: None,
            keep_files: false,
            search: SearchConfig::default(),
            concurrency: 1,
            units: UnitSystem::default(),
            exit_loss_option: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossingResult {
    pub outcome: QueryOutcome,
    /// Directory holding the scratch files when they were kept.
    pub workspace: Option<PathBuf>,
}

#[allow(clippy::too_many_arguments)]
fn query_in_dir(
    invoker: &dyn SolverInvoker,
    crossing: &Crossing,
    project: Option<&Project>,
    query: &HydraulicQuery,
    options: &RunOptions,
    dir: &Path,
    journal: bool,
    progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> AppResult<QueryOutcome> {
    let snapshot = match project {
        Some(parent) => parent.snapshot_with(crossing),
        None => Project::standalone(crossing, options.units, options.exit_loss_option),
    };
    let mut evaluator = CrossingEvaluator::new(invoker, snapshot, dir)?;
    if journal {
        evaluator = evaluator.with_journal();
    }
    let outcome = match *query {
        HydraulicQuery::HeadwaterFromFlow { flow } => {
            headwater_from_flow(&mut evaluator, crossing, flow, progress_cb)
        }
        HydraulicQuery::FlowFromHeadwater { headwater, hint } => flow_from_headwater(
            &mut evaluator,
            crossing,
            headwater,
            hint,
            &options.search,
            progress_cb,
        ),
        HydraulicQuery::FlowForRatio { ratio, hint } => flow_for_ratio(
            &mut evaluator,
            crossing,
            ratio,
            hint,
            &options.search,
            progress_cb,
        ),
    }?;
    debug!(crossing = %crossing.name, runs = evaluator.runs(), "query finished");
    Ok(outcome)
}

/// Run one query for one crossing. `project` supplies metadata for the
/// scratch project; without it a standalone project in `options.units` is used.
pub fn run_crossing_query(
    invoker: &dyn SolverInvoker,
    crossing: &Crossing,
    project: Option<&Project>,
    query: &HydraulicQuery,
    options: &RunOptions,
    progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> AppResult<CrossingResult> {
    info!(crossing = %crossing.name, ?query, "running crossing query");
    let ws = ScratchWorkspace::prepare(options.workspace.as_deref(), options.keep_files)?;
    let retained = ws.is_retained();
    let outcome = query_in_dir(
        invoker,
        crossing,
        project,
        query,
        options,
        ws.path(),
        retained,
        progress_cb,
    )?;
    Ok(CrossingResult {
        outcome,
        workspace: retained.then(|| ws.path().to_path_buf()),
    })
}

/// Result key for a crossing; repeated names get a `(duplicate #n)` suffix.
pub fn unique_crossing_key(name: &str, counts: &mut HashMap<String, usize>) -> String {
    let count = counts.entry(name.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        name.to_string()
    } else {
        format!("{name} (duplicate #{count})")
    }
}

/// Run the same query for every crossing of `project`.
///
/// Crossings run on a pool of `options.concurrency` workers, each in its own
/// `crossing_NNN` sub-directory. Results come back in crossing order; the first
/// failing crossing in that order is the error returned for the batch.
pub fn run_project_query(
    invoker: &dyn SolverInvoker,
    project: &Project,
    query: &HydraulicQuery,
    options: &RunOptions,
) -> AppResult<Vec<(String, CrossingResult)>> {
    info!(crossings = project.crossings.len(), ?query, workers = options.concurrency, "running project query");
    let ws = ScratchWorkspace::prepare(options.workspace.as_deref(), options.keep_files)?;
    let retained = ws.is_retained();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.concurrency.max(1))
        .build()?;

    let results: Vec<AppResult<CrossingResult>> = pool.install(|| {
        project
            .crossings
            .par_iter()
            .enumerate()
            .map(|(idx, crossing)| -> AppResult<CrossingResult> {
                let dir = ws.child(idx + 1)?;
                let outcome = query_in_dir(
                    invoker,
                    crossing,
                    Some(project),
                    query,
                    options,
                    &dir,
                    retained,
                    None,
                )?;
                Ok(CrossingResult {
                    outcome,
                    workspace: retained.then_some(dir),
                })
            })
            .collect()
    });

    let mut counts = HashMap::new();
    project
        .crossings
        .iter()
        .zip(results)
        .map(|(crossing, result)| -> AppResult<(String, CrossingResult)> {
            Ok((unique_crossing_key(&crossing.name, &mut counts), result?))
        })
        .collect()
}
