//! Inverse solving over an external hydraulic solver.
//!
//! The solver itself is a black box behind [`Evaluator`]: one call runs a
//! single trial flow and returns the report row nearest to it. Forward queries
//! make one call; inverse queries bracket the target headwater and refine by
//! regula falsi within a fixed evaluation budget.

pub mod error;
pub mod evaluator;
pub mod geometry;
pub mod progress;
pub mod queries;
pub mod search;

pub use error::{SolverError, SolverResult};
pub use evaluator::Evaluator;
pub use geometry::{characteristic_diameter, ratio_target, simple_flow_estimate};
pub use progress::{SearchProgressEvent, SearchStage};
pub use queries::{QueryOutcome, flow_for_ratio, flow_from_headwater, headwater_from_flow};
pub use search::{Sample, SearchConfig, SearchOutcome, search_flow};
