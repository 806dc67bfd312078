//! Crossing geometry used to seed and target searches.

use std::f64::consts::PI;

use cf_project::{CulvertShape, Crossing};

use crate::error::{SolverError, SolverResult};

/// Span of circular barrels, rise of box barrels. All barrels must share a shape.
pub fn characteristic_diameter(crossing: &Crossing) -> SolverResult<f64> {
    let Some(reference) = crossing.barrels.first() else {
        return Err(SolverError::invalid(format!(
            "crossing '{}' has no culvert barrels",
            crossing.name
        )));
    };
    let diameter = match reference.shape {
        CulvertShape::Circle => reference.span,
        CulvertShape::Box => reference.rise,
    };
    if diameter.is_nan() || diameter <= 0.0 {
        return Err(SolverError::invalid(format!(
            "characteristic diameter of '{}' must be greater than zero (got {diameter})",
            reference.name
        )));
    }
    if let Some(other) = crossing.barrels[1..]
        .iter()
        .find(|b| b.shape != reference.shape)
    {
        return Err(SolverError::invalid(format!(
            "barrel '{}' is a {} but '{}' is a {}; all barrels must share one shape",
            other.name, other.shape, reference.name, reference.shape
        )));
    }
    Ok(diameter)
}

/// Full-barrel area times the barrel count.
pub fn simple_flow_estimate(crossing: &Crossing) -> SolverResult<f64> {
    let d = characteristic_diameter(crossing)?;
    Ok(PI * d * d / 4.0 * crossing.total_barrels() as f64)
}

/// Headwater elevation at `ratio` diameters above the first inlet invert.
pub fn ratio_target(crossing: &Crossing, ratio: f64) -> SolverResult<f64> {
    if ratio.is_nan() || ratio < 0.0 {
        return Err(SolverError::invalid(format!(
            "headwater-to-diameter ratio must be non-negative (got {ratio})"
        )));
    }
    let d = characteristic_diameter(crossing)?;
    let invert = crossing.barrels[0].inlet_invert_elevation;
    Ok(invert + ratio * d)
}
