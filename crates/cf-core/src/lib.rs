//! cf-core: units and float helpers for culvertflow.
//!
//! The solver works in English units (ft, cfs, ft/s); projects may declare SI.
//! [`UnitSystem`] converts between the two at the file and report boundaries.

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
