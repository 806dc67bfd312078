// cf-core/src/units.rs
//
// The external solver stores every length in feet, every discharge in cfs and
// every velocity in ft/s. In-memory values use the project's declared system.

use core::fmt;
use core::str::FromStr;

use uom::si::f64::{Length as UomLength, Velocity as UomVelocity, VolumeRate as UomVolumeRate};
use uom::si::length::{foot, meter};
use uom::si::velocity::{foot_per_second, meter_per_second};
use uom::si::volume_rate::{cubic_foot_per_second, cubic_meter_per_second};

use crate::CoreError;

pub type Length = UomLength;
pub type Discharge = UomVolumeRate;
pub type Velocity = UomVelocity;

#[inline]
pub fn ft(v: f64) -> Length {
    Length::new::<foot>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    Length::new::<meter>(v)
}

#[inline]
pub fn cfs(v: f64) -> Discharge {
    Discharge::new::<cubic_foot_per_second>(v)
}

#[inline]
pub fn cms(v: f64) -> Discharge {
    Discharge::new::<cubic_meter_per_second>(v)
}

#[inline]
pub fn fps(v: f64) -> Velocity {
    Velocity::new::<foot_per_second>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    Velocity::new::<meter_per_second>(v)
}

/// Unit system declared by a project.
///
/// Each variant carries a display flag (`EN`/`SI`, also used on the solver
/// command line) and the numeric flag written to the `UNITS` card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitSystem {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "EN", alias = "English", alias = "ENGLISH"))]
    English,
    #[cfg_attr(feature = "serde", serde(rename = "SI", alias = "si"))]
    Si,
}

impl UnitSystem {
    pub const ALL: [UnitSystem; 2] = [UnitSystem::English, UnitSystem::Si];

    pub fn cli_flag(self) -> &'static str {
        match self {
            UnitSystem::English => "EN",
            UnitSystem::Si => "SI",
        }
    }

    pub fn project_flag(self) -> i64 {
        match self {
            UnitSystem::English => 0,
            UnitSystem::Si => 1,
        }
    }

    /// Any flag other than the SI flag reads as English.
    pub fn from_project_flag(flag: i64) -> Self {
        if flag == UnitSystem::Si.project_flag() {
            UnitSystem::Si
        } else {
            UnitSystem::English
        }
    }

    pub fn is_native(self) -> bool {
        self == UnitSystem::English
    }

    pub fn length_from_native(self, feet: f64) -> f64 {
        match self {
            UnitSystem::English => feet,
            UnitSystem::Si => ft(feet).get::<meter>(),
        }
    }

    pub fn length_to_native(self, value: f64) -> f64 {
        match self {
            UnitSystem::English => value,
            UnitSystem::Si => m(value).get::<foot>(),
        }
    }

    pub fn flow_from_native(self, value_cfs: f64) -> f64 {
        match self {
            UnitSystem::English => value_cfs,
            UnitSystem::Si => cfs(value_cfs).get::<cubic_meter_per_second>(),
        }
    }

    pub fn flow_to_native(self, value: f64) -> f64 {
        match self {
            UnitSystem::English => value,
            UnitSystem::Si => cms(value).get::<cubic_foot_per_second>(),
        }
    }

    pub fn velocity_from_native(self, value_fps: f64) -> f64 {
        match self {
            UnitSystem::English => value_fps,
            UnitSystem::Si => fps(value_fps).get::<meter_per_second>(),
        }
    }

    pub fn velocity_to_native(self, value: f64) -> f64 {
        match self {
            UnitSystem::English => value,
            UnitSystem::Si => mps(value).get::<foot_per_second>(),
        }
    }

    pub fn length_label(self) -> &'static str {
        match self {
            UnitSystem::English => "ft",
            UnitSystem::Si => "m",
        }
    }

    pub fn flow_label(self) -> &'static str {
        match self {
            UnitSystem::English => "cfs",
            UnitSystem::Si => "cms",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_flag())
    }
}

impl FromStr for UnitSystem {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        UnitSystem::ALL
            .into_iter()
            .find(|unit| {
                unit.cli_flag() == normalized
                    || (normalized == "ENGLISH" && *unit == UnitSystem::English)
            })
            .ok_or(CoreError::UnknownUnitSystem {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _l = m(2.0);
        let _f = ft(2.0);
        let _q = cms(1.0);
        let _q2 = cfs(1.0);
        let _v = mps(1.0);
        let _v2 = fps(1.0);
    }

    #[test]
    fn english_is_identity() {
        let units = UnitSystem::English;
        assert_eq!(units.length_from_native(12.5), 12.5);
        assert_eq!(units.flow_to_native(3.25), 3.25);
        assert_eq!(units.velocity_from_native(7.0), 7.0);
    }

    #[test]
    fn si_conversions_match_reference_factors() {
        let units = UnitSystem::Si;
        assert!((units.length_from_native(1.0) - 0.3048).abs() < 1e-12);
        assert!((units.flow_from_native(1.0) - 0.028_316_846_592).abs() < 1e-12);
        assert!((units.velocity_from_native(1.0) - 0.3048).abs() < 1e-12);
        assert!((units.length_to_native(0.3048) - 1.0).abs() < 1e-12);
        assert!((units.flow_to_native(0.028_316_846_592) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flags_round_trip() {
        for unit in UnitSystem::ALL {
            assert_eq!(UnitSystem::from_project_flag(unit.project_flag()), unit);
            assert_eq!(unit.cli_flag().parse::<UnitSystem>().unwrap(), unit);
        }
        assert_eq!(UnitSystem::from_project_flag(7), UnitSystem::English);
        assert!("metric".parse::<UnitSystem>().is_err());
        assert_eq!(" si ".parse::<UnitSystem>().unwrap(), UnitSystem::Si);
    }
}
