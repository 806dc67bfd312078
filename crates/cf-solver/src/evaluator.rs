use cf_results::ResultRow;

/// One trial run of the external solver at a given flow.
///
/// Implementations return the report row nearest the requested flow. The
/// error type must absorb [`crate::SolverError`] so search failures and
/// evaluation failures travel through the same channel.
pub trait Evaluator {
    type Error;

    fn evaluate(&mut self, flow: f64) -> Result<ResultRow, Self::Error>;
}

impl<F, E> Evaluator for F
where
    F: FnMut(f64) -> Result<ResultRow, E>,
{
    type Error = E;

    fn evaluate(&mut self, flow: f64) -> Result<ResultRow, E> {
        self(flow)
    }
}
