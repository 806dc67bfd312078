//! Error types for inverse queries.

use thiserror::Error;

use crate::search::Sample;

fn describe_best(best: &Option<Sample>) -> String {
    match best {
        Some(s) => format!("; closest sample flow {} gave headwater {}", s.flow, s.headwater),
        None => "; no sample produced a headwater".to_string(),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error(
        "Unable to bracket headwater {target} within {evaluations} evaluations{}",
        describe_best(.best)
    )]
    UnableToBracket {
        target: f64,
        evaluations: usize,
        best: Option<Sample>,
    },

    #[error(
        "Target headwater {target} exceeds crossing capacity: headwater levels off at {max_headwater} near flow {at_flow}"
    )]
    CapacityExceeded {
        target: f64,
        max_headwater: f64,
        at_flow: f64,
        best: Sample,
    },

    #[error(
        "Target headwater {target} lies below the lowest reachable headwater {min_headwater}"
    )]
    BelowMinimumHeadwater {
        target: f64,
        min_headwater: f64,
        best: Sample,
    },

    #[error("Invalid query: {what}")]
    InvalidQuery { what: String },

    #[error(transparent)]
    Numeric(#[from] cf_core::CoreError),
}

impl SolverError {
    /// Closest sample seen before the search gave up.
    pub fn best_sample(&self) -> Option<&Sample> {
        match self {
            SolverError::UnableToBracket { best, .. } => best.as_ref(),
            SolverError::CapacityExceeded { best, .. }
            | SolverError::BelowMinimumHeadwater { best, .. } => Some(best),
            SolverError::InvalidQuery { .. } | SolverError::Numeric(_) => None,
        }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SolverError::InvalidQuery { what: what.into() }
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
