//! Closed enumerations that the project file stores as integer codes.
//!
//! Every table lists its numeric code explicitly; nothing relies on the
//! declaration order of the variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowercase, trim and fold `-`/space into `_` so that `"Corrugated Steel"`,
/// `"corrugated-steel"` and `"CORRUGATED_STEEL"` all compare equal.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident (default $default:ident) {
            $( $variant:ident = $code:literal, $key:literal, $label:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $key)] $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Numeric code written to the project file.
            pub fn code(self) -> i64 {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Stable machine name used by configuration documents.
            pub fn key(self) -> &'static str {
                match self {
                    $( $name::$variant => $key, )+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Accepts the machine name in any case/separator style, or the
            /// numeric code written as text.
            pub fn from_name(name: &str) -> Option<Self> {
                let normalized = normalize_name(name);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.key() == normalized)
                    .or_else(|| normalized.parse::<i64>().ok().and_then(Self::from_code))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

code_table! {
    /// How the solver should interpret the flow definition (`DISCHARGEMETHOD`).
    pub enum FlowMethod (default UserDefined) {
        MinDesignMax = 0, "min_design_max", "Minimum, design and maximum";
        UserDefined = 1, "user_defined", "User-defined";
    }
}

code_table! {
    /// Tailwater boundary condition categories (`TAILWATERTYPE`).
    pub enum TailwaterType (default Constant) {
        Rectangular = 1, "rectangular", "Rectangular channel";
        Trapezoidal = 2, "trapezoidal", "Trapezoidal channel";
        Triangular = 3, "triangular", "Triangular channel";
        Irregular = 4, "irregular", "Irregular channel";
        RatingCurve = 5, "rating_curve", "Rating curve";
        Constant = 6, "constant", "Constant tailwater elevation";
    }
}

code_table! {
    /// Roadway surface used for overtopping friction (`SURFACE`).
    pub enum RoadwaySurface (default Paved) {
        Paved = 1, "paved", "Paved";
        Gravel = 2, "gravel", "Gravel";
        UserDefined = 3, "user_defined", "User-defined";
    }
}

code_table! {
    pub enum CulvertShape (default Circle) {
        Circle = 1, "circle", "Circular";
        Box = 2, "box", "Concrete box";
    }
}

code_table! {
    pub enum CulvertMaterial (default Concrete) {
        Concrete = 1, "concrete", "Concrete";
        CorrugatedSteel = 2, "corrugated_steel", "Corrugated steel";
        Hdpe = 5, "hdpe", "HDPE";
    }
}

code_table! {
    /// Inlet geometry (`INLETTYPE`).
    pub enum InletType (default Straight) {
        NotSet = 0, "not_set", "Not set";
        Straight = 1, "straight", "Straight";
        SideTapered = 2, "side_tapered", "Side tapered";
        SlopeTapered = 3, "slope_tapered", "Slope tapered";
        SingleBrokenBack = 4, "single_broken_back", "Single broken-back";
        DoubleBrokenBack = 5, "double_broken_back", "Double broken-back";
    }
}

code_table! {
    /// Inlet edge treatment for current solver releases (`INLETEDGETYPE`).
    pub enum InletEdgeType (default ThinEdgeProjecting) {
        ThinEdgeProjecting = 0, "thin_edge_projecting", "Thin edge projecting";
        GroovedEndProjecting = 1, "grooved_end_projecting", "Grooved end projecting";
        GroovedEndWithHeadwall = 2, "grooved_end_with_headwall", "Grooved end with headwall";
        BeveledEdge = 3, "beveled_edge", "Beveled edge";
        SquareEdgeWithHeadwall = 4, "square_edge_with_headwall", "Square edge with headwall";
        MiteredToSlope = 5, "mitered_to_slope", "Mitered to conform with fill slope";
        Headwall = 6, "headwall", "Headwall / flared end";
    }
}

code_table! {
    /// Legacy 7.1 inlet edge numbering (`INLETEDGETYPE71`).
    pub enum InletEdgeType71 (default Code0) {
        Code0 = 0, "code_0", "Legacy edge code 0";
        Code1 = 1, "code_1", "Legacy edge code 1";
        Code2 = 2, "code_2", "Legacy edge code 2";
        Code3 = 3, "code_3", "Legacy edge code 3";
        Code4 = 4, "code_4", "Legacy edge code 4";
    }
}

code_table! {
    /// Improved inlet treatments (`IMPINLETEDGETYPE`).
    pub enum ImprovedInletEdgeType (default NotImproved) {
        NotImproved = 0, "none", "None";
        Type1 = 1, "type_1", "Improved inlet type 1";
        Type2 = 2, "type_2", "Improved inlet type 2";
        Type3 = 3, "type_3", "Improved inlet type 3";
        Type4 = 4, "type_4", "Improved inlet type 4";
        Type5 = 5, "type_5", "Improved inlet type 5";
        Type6 = 6, "type_6", "Improved inlet type 6";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_explicit_not_ordinal() {
        assert_eq!(CulvertMaterial::Hdpe.code(), 5);
        assert_eq!(CulvertMaterial::from_code(5), Some(CulvertMaterial::Hdpe));
        assert_eq!(CulvertMaterial::from_code(3), None);
        assert_eq!(TailwaterType::Constant.code(), 6);
        assert_eq!(InletType::NotSet.code(), 0);
    }

    #[test]
    fn every_table_round_trips_through_its_codes() {
        for v in TailwaterType::ALL {
            assert_eq!(TailwaterType::from_code(v.code()), Some(*v));
        }
        for v in InletEdgeType::ALL {
            assert_eq!(InletEdgeType::from_code(v.code()), Some(*v));
        }
        for v in ImprovedInletEdgeType::ALL {
            assert_eq!(ImprovedInletEdgeType::from_name(v.key()), Some(*v));
        }
    }

    #[test]
    fn names_are_lenient() {
        assert_eq!(
            CulvertMaterial::from_name("Corrugated Steel"),
            Some(CulvertMaterial::CorrugatedSteel)
        );
        assert_eq!(
            FlowMethod::from_name("min-design-max"),
            Some(FlowMethod::MinDesignMax)
        );
        assert_eq!(RoadwaySurface::from_name("USER_DEFINED"), Some(RoadwaySurface::UserDefined));
        assert_eq!(CulvertShape::from_name("2"), Some(CulvertShape::Box));
        assert_eq!(FlowMethod::from_name("min-max-increment"), None);
    }

    #[test]
    fn defaults_match_barrel_defaults() {
        assert_eq!(InletType::default(), InletType::Straight);
        assert_eq!(InletEdgeType::default(), InletEdgeType::ThinEdgeProjecting);
        assert_eq!(InletEdgeType71::default(), InletEdgeType71::Code0);
        assert_eq!(ImprovedInletEdgeType::default(), ImprovedInletEdgeType::NotImproved);
        assert_eq!(ImprovedInletEdgeType::NotImproved.label(), "None");
    }
}
