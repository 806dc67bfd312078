//! Crossing-level queries.

use cf_core::ensure_finite;
use cf_project::Crossing;
use cf_results::ResultRow;
use tracing::info;

use crate::error::SolverError;
use crate::evaluator::Evaluator;
use crate::geometry::{ratio_target, simple_flow_estimate};
use crate::progress::{SearchProgressEvent, SearchStage, emit};
use crate::search::{SearchConfig, SearchOutcome, search_flow};

/// Answer to a single crossing query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub crossing: String,
    pub requested_flow: Option<f64>,
    pub requested_headwater: Option<f64>,
    pub flow: f64,
    pub headwater: f64,
    pub row: ResultRow,
    pub evaluations: usize,
}

impl QueryOutcome {
    fn from_search(crossing: &Crossing, target: f64, outcome: SearchOutcome) -> Self {
        Self {
            crossing: crossing.name.clone(),
            requested_flow: None,
            requested_headwater: Some(target),
            flow: outcome.flow,
            headwater: outcome.headwater,
            row: outcome.row,
            evaluations: outcome.evaluations,
        }
    }
}

/// Headwater produced by `flow`. One evaluation.
pub fn headwater_from_flow<V>(
    evaluator: &mut V,
    crossing: &Crossing,
    flow: f64,
    mut progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> Result<QueryOutcome, V::Error>
where
    V: Evaluator,
    V::Error: From<SolverError>,
{
    let flow = ensure_finite(flow, "flow").map_err(SolverError::from)?;
    if flow < 0.0 {
        return Err(SolverError::invalid(format!("flow cannot be negative (got {flow})")).into());
    }
    info!(crossing = %crossing.name, flow, "computing headwater");
    let row = evaluator.evaluate(flow)?;
    emit(
        &mut progress_cb,
        SearchStage::Forward,
        1,
        flow,
        row.headwater_elevation,
    );
    Ok(QueryOutcome {
        crossing: crossing.name.clone(),
        requested_flow: Some(flow),
        requested_headwater: None,
        flow: row.flow,
        headwater: row.headwater_elevation,
        row,
        evaluations: 1,
    })
}

/// Flow that produces headwater elevation `target`.
pub fn flow_from_headwater<V>(
    evaluator: &mut V,
    crossing: &Crossing,
    target: f64,
    hint: Option<f64>,
    config: &SearchConfig,
    progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> Result<QueryOutcome, V::Error>
where
    V: Evaluator,
    V::Error: From<SolverError>,
{
    let estimate = simple_flow_estimate(crossing)?;
    info!(crossing = %crossing.name, target, estimate, "searching flow for headwater");
    let outcome = search_flow(evaluator, target, estimate, hint, config, progress_cb)?;
    Ok(QueryOutcome::from_search(crossing, target, outcome))
}

/// Flow whose headwater sits `ratio` characteristic diameters above the inlet invert.
pub fn flow_for_ratio<V>(
    evaluator: &mut V,
    crossing: &Crossing,
    ratio: f64,
    hint: Option<f64>,
    config: &SearchConfig,
    progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> Result<QueryOutcome, V::Error>
where
    V: Evaluator,
    V::Error: From<SolverError>,
{
    let target = ratio_target(crossing, ratio)?;
    info!(crossing = %crossing.name, ratio, target, "searching flow for headwater ratio");
    flow_from_headwater(evaluator, crossing, target, hint, config, progress_cb)
}
