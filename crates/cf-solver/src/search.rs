//! Bracketing flow search for a target headwater.

use cf_core::{distance, round_to};
use cf_results::ResultRow;
use tracing::{debug, info};

use crate::error::SolverError;
use crate::evaluator::Evaluator;
use crate::progress::{SearchProgressEvent, SearchStage, emit};

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Solver runs allowed per query, seeds included.
    pub max_evaluations: usize,
    /// Absolute headwater tolerance.
    pub tolerance: f64,
    /// Headwater rise below which two successive flow doublings count as a
    /// capacity plateau.
    pub stall_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 12,
            tolerance: 1e-4,
            stall_tolerance: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub flow: f64,
    pub headwater: f64,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub flow: f64,
    pub headwater: f64,
    pub row: ResultRow,
    pub evaluations: usize,
    /// Every evaluated sample in evaluation order.
    pub samples: Vec<Sample>,
}

struct FlowSearch<'a> {
    target: f64,
    estimate: f64,
    hint: Option<f64>,
    config: &'a SearchConfig,
    samples: Vec<(Sample, ResultRow)>,
}

impl FlowSearch<'_> {
    fn seeds(&self) -> Vec<f64> {
        let est = self.estimate.max(0.0);
        let base = match self.hint {
            Some(h) if h > 0.0 => vec![0.0, 0.9 * h, h, 1.1 * h, est],
            _ => vec![0.0, est / 2.0, est],
        };
        let mut seen: Vec<f64> = Vec::with_capacity(base.len());
        let mut seeds = Vec::with_capacity(base.len());
        for value in base {
            let key = round_to(value, 6);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            seeds.push(value);
        }
        seeds
    }

    fn valid(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples
            .iter()
            .map(|(s, _)| s)
            .filter(|s| !s.headwater.is_nan())
    }

    fn delta(&self, sample: &Sample) -> f64 {
        sample.headwater - self.target
    }

    fn exact_match(&self) -> Option<usize> {
        self.samples.iter().position(|(s, _)| {
            !s.headwater.is_nan() && self.delta(s).abs() <= self.config.tolerance
        })
    }

    fn highest_low(&self) -> Option<Sample> {
        self.valid()
            .filter(|s| self.delta(s) <= 0.0)
            .copied()
            .max_by(|a, b| a.flow.total_cmp(&b.flow))
    }

    fn lowest_high(&self) -> Option<Sample> {
        self.valid()
            .filter(|s| self.delta(s) >= 0.0)
            .copied()
            .min_by(|a, b| a.flow.total_cmp(&b.flow))
    }

    fn bracket(&self) -> Option<(Sample, Sample)> {
        let low = self.highest_low()?;
        let high = self.lowest_high()?;
        if low.flow == high.flow && self.delta(&low).abs() > self.config.tolerance {
            return None;
        }
        Some((low, high))
    }

    fn expansion_guess(&self) -> f64 {
        if let Some(low) = self.highest_low() {
            if low.flow > 0.0 {
                return low.flow * 2.0;
            }
            return if self.estimate > 0.0 { self.estimate } else { 1.0 };
        }
        if let Some(high) = self.lowest_high() {
            return high.flow / 2.0;
        }
        if self.estimate > 0.0 {
            self.estimate
        } else {
            self.hint.filter(|h| *h > 0.0).unwrap_or(1.0)
        }
    }

    /// Closest sample to the target.
    fn best(&self) -> Option<Sample> {
        self.valid()
            .copied()
            .min_by(|a, b| distance(a.headwater, self.target).total_cmp(&distance(b.headwater, self.target)))
    }

    /// Lowest valid headwater seen, usually the tailwater-controlled floor.
    fn floor(&self) -> f64 {
        self.valid()
            .map(|s| s.headwater)
            .fold(f64::INFINITY, f64::min)
    }

    /// All samples sit below the target and the last two upward expansions
    /// past the estimate left the headwater flat above the floor.
    fn capacity_exceeded(&self) -> Option<SolverError> {
        if self.lowest_high().is_some() || self.exact_match().is_some() {
            return None;
        }
        let (newest, _) = self.samples.last()?;
        if newest.headwater.is_nan() {
            return None;
        }
        let mut lows: Vec<Sample> = self.valid().copied().collect();
        lows.sort_by(|a, b| a.flow.total_cmp(&b.flow));
        let [.., first, previous, top] = lows.as_slice() else {
            return None;
        };
        if top != newest || top.flow < self.estimate || top.flow <= previous.flow {
            return None;
        }
        let stall = self.config.stall_tolerance;
        if top.headwater - first.headwater > stall || previous.headwater - first.headwater > stall {
            return None;
        }
        if first.headwater - self.floor() <= stall {
            return None;
        }
        let max_headwater = lows
            .iter()
            .map(|s| s.headwater)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(SolverError::CapacityExceeded {
            target: self.target,
            max_headwater,
            at_flow: top.flow,
            best: self.best().unwrap_or(*top),
        })
    }

    /// Zero flow already overshoots the target and nothing sits below it.
    fn below_minimum(&self) -> Option<SolverError> {
        if self.highest_low().is_some() || self.exact_match().is_some() {
            return None;
        }
        let zero = self
            .valid()
            .find(|s| s.flow <= 0.0 && self.delta(s) > self.config.tolerance)?;
        Some(SolverError::BelowMinimumHeadwater {
            target: self.target,
            min_headwater: self.floor(),
            best: self.best().unwrap_or(*zero),
        })
    }

    fn unable(&self) -> SolverError {
        SolverError::UnableToBracket {
            target: self.target,
            evaluations: self.samples.len(),
            best: self.best(),
        }
    }

    fn outcome(&self, idx: usize) -> SearchOutcome {
        let (sample, row) = &self.samples[idx];
        SearchOutcome {
            flow: sample.flow,
            headwater: sample.headwater,
            row: row.clone(),
            evaluations: self.samples.len(),
            samples: self.samples.iter().map(|(s, _)| *s).collect(),
        }
    }
}

/// Find the flow whose headwater matches `target`.
///
/// `estimate` seeds the search and stands in when no bracket exists yet;
/// a positive `hint` adds seeds around the expected answer.
pub fn search_flow<V>(
    evaluator: &mut V,
    target: f64,
    estimate: f64,
    hint: Option<f64>,
    config: &SearchConfig,
    mut progress_cb: Option<&mut dyn FnMut(SearchProgressEvent)>,
) -> Result<SearchOutcome, V::Error>
where
    V: Evaluator,
    V::Error: From<SolverError>,
{
    if target.is_nan() {
        return Err(SolverError::invalid("target headwater cannot be NaN").into());
    }
    let mut search = FlowSearch {
        target,
        estimate,
        hint,
        config,
        samples: Vec::new(),
    };

    let mut run = |search: &mut FlowSearch<'_>,
                   stage: SearchStage,
                   flow: f64|
     -> Result<(), V::Error> {
        if search.samples.len() >= search.config.max_evaluations {
            return Err(search.unable().into());
        }
        let row = evaluator.evaluate(flow)?;
        let sample = Sample {
            flow,
            headwater: row.headwater_elevation,
        };
        search.samples.push((sample, row));
        let evaluation = search.samples.len();
        debug!(?stage, evaluation, flow, headwater = sample.headwater, "search evaluation");
        emit(&mut progress_cb, stage, evaluation, flow, sample.headwater);
        if stage == SearchStage::Expanding
            && let Some(err) = search.capacity_exceeded()
        {
            return Err(err.into());
        }
        Ok(())
    };

    for seed in search.seeds() {
        run(&mut search, SearchStage::Seeding, seed)?;
        if let Some(idx) = search.exact_match() {
            return Ok(converged(&search, idx));
        }
    }

    loop {
        if let Some(idx) = search.exact_match() {
            return Ok(converged(&search, idx));
        }
        let (stage, guess) = match search.bracket() {
            Some((low, high)) => {
                let slope = high.headwater - low.headwater;
                let interpolated = low.flow + (target - low.headwater) / slope * (high.flow - low.flow);
                let inside = interpolated > low.flow.min(high.flow)
                    && interpolated < low.flow.max(high.flow);
                if slope != 0.0 && interpolated.is_finite() && inside {
                    (SearchStage::Interpolating, interpolated)
                } else {
                    (SearchStage::Bisecting, (low.flow + high.flow) / 2.0)
                }
            }
            None => {
                if let Some(err) = search.below_minimum() {
                    return Err(err.into());
                }
                (SearchStage::Expanding, search.expansion_guess())
            }
        };
        run(&mut search, stage, guess)?;
    }
}

fn converged(search: &FlowSearch<'_>, idx: usize) -> SearchOutcome {
    let outcome = search.outcome(idx);
    info!(
        target = search.target,
        flow = outcome.flow,
        headwater = outcome.headwater,
        evaluations = outcome.evaluations,
        "headwater target reached"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SolverResult;

    fn search(config: &SearchConfig, estimate: f64, hint: Option<f64>) -> FlowSearch<'_> {
        FlowSearch {
            target: 106.0,
            estimate,
            hint,
            config,
            samples: Vec::new(),
        }
    }

    fn push(search: &mut FlowSearch<'_>, flow: f64, headwater: f64) {
        search
            .samples
            .push((Sample { flow, headwater }, ResultRow::with_headwater(flow, headwater)));
    }

    #[test]
    fn seeds_with_hint_surround_it() {
        let config = SearchConfig::default();
        let s = search(&config, 20.0, Some(4.0));
        assert_eq!(s.seeds(), vec![0.0, 3.6, 4.0, 4.4, 20.0]);
    }

    #[test]
    fn seeds_are_deduplicated() {
        let config = SearchConfig::default();
        let s = search(&config, 4.0, Some(4.0));
        assert_eq!(s.seeds(), vec![0.0, 3.6, 4.0, 4.4]);
        let s = search(&config, 0.0, None);
        assert_eq!(s.seeds(), vec![0.0]);
    }

    #[test]
    fn seeds_without_hint_halve_estimate() {
        let config = SearchConfig::default();
        let s = search(&config, 8.0, Some(-1.0));
        assert_eq!(s.seeds(), vec![0.0, 4.0, 8.0]);
    }

    #[test]
    fn bracket_takes_tightest_pair_and_skips_nan() {
        let config = SearchConfig::default();
        let mut s = search(&config, 8.0, None);
        push(&mut s, 0.0, 100.0);
        push(&mut s, 4.0, 104.0);
        push(&mut s, 6.0, f64::NAN);
        push(&mut s, 12.0, 107.0);
        push(&mut s, 9.0, 106.5);
        let (low, high) = s.bracket().unwrap();
        assert_eq!(low.flow, 4.0);
        assert_eq!(high.flow, 9.0);
    }

    #[test]
    fn expansion_doubles_highest_low_then_halves_lowest_high() {
        let config = SearchConfig::default();
        let mut s = search(&config, 8.0, None);
        push(&mut s, 0.0, 100.0);
        assert_eq!(s.expansion_guess(), 8.0);
        push(&mut s, 8.0, 103.0);
        assert_eq!(s.expansion_guess(), 16.0);

        let mut s = search(&config, 8.0, None);
        push(&mut s, 8.0, 110.0);
        assert_eq!(s.expansion_guess(), 4.0);

        let s = search(&config, 0.0, Some(3.0));
        assert_eq!(s.expansion_guess(), 3.0);
        let s = search(&config, 0.0, None);
        assert_eq!(s.expansion_guess(), 1.0);
    }

    #[test]
    fn plateau_needs_two_flat_doublings_above_the_floor() {
        let config = SearchConfig::default();
        let mut s = search(&config, 10.0, None);
        push(&mut s, 0.0, 100.0);
        push(&mut s, 5.0, 105.0);
        push(&mut s, 10.0, 105.0);
        assert!(s.capacity_exceeded().is_none());
        push(&mut s, 20.0, 105.0);
        assert!(matches!(
            s.capacity_exceeded(),
            Some(SolverError::CapacityExceeded { at_flow, .. }) if at_flow == 20.0
        ));

        let mut s = search(&config, 10.0, None);
        push(&mut s, 0.0, 100.5);
        push(&mut s, 5.0, 100.5);
        push(&mut s, 10.0, 100.5);
        push(&mut s, 20.0, 100.5);
        assert!(s.capacity_exceeded().is_none());
    }

    #[test]
    fn target_under_zero_flow_headwater_is_flagged() {
        let config = SearchConfig::default();
        let mut s = search(&config, 10.0, None);
        push(&mut s, 0.0, 107.0);
        push(&mut s, 5.0, 108.0);
        assert!(matches!(
            s.below_minimum(),
            Some(SolverError::BelowMinimumHeadwater { min_headwater, .. }) if min_headwater == 107.0
        ));
        push(&mut s, 2.0, 104.0);
        assert!(s.below_minimum().is_none());
    }

    #[test]
    fn nan_target_is_rejected() {
        let mut eval = |q: f64| -> SolverResult<ResultRow> { Ok(ResultRow::with_headwater(q, q)) };
        let err = search_flow(&mut eval, f64::NAN, 1.0, None, &SearchConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidQuery { .. }));
    }
}
