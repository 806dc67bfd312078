//! Project validation logic.
//!
//! Every entity reports its own problems as human-readable strings; the
//! project-level entry point collects all of them instead of stopping at the
//! first one.

use crate::codes::{CulvertShape, TailwaterType};
use crate::schema::{Barrel, Crossing, Flow, Project, Roadway, Tailwater};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Project failed validation:\n{}", .problems.join("\n"))]
    Invariants { problems: Vec<String> },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },
}

impl ValidationError {
    pub fn problems(&self) -> Vec<String> {
        match self {
            ValidationError::Invariants { problems } => problems.clone(),
            ValidationError::Unsupported { feature, reason } => {
                vec![format!("{feature}: {reason}")]
            }
        }
    }
}

/// Field-level invariant checks. `prefix` is prepended to every message.
pub trait Validate {
    fn problems(&self, prefix: &str) -> Vec<String>;
}

impl Validate for Flow {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            Flow::MinDesignMax {
                minimum,
                design,
                maximum,
            } => {
                if !(minimum < design && design < maximum) {
                    out.push(format!("{prefix}Min/Design/Max must be strictly increasing."));
                }
                if *minimum < 0.0 {
                    out.push(format!("{prefix}Minimum flow must be >= 0."));
                }
            }
            Flow::UserDefined { values, labels } => {
                if values.is_empty() {
                    out.push(format!("{prefix}Provide at least one user-defined flow value."));
                } else if values.windows(2).any(|w| !(w[0] < w[1])) {
                    out.push(format!("{prefix}User-defined flows must be strictly increasing."));
                }
                if !labels.is_empty() && labels.len() != values.len() {
                    out.push(format!(
                        "{prefix}Provide the same number of flow labels as flow values."
                    ));
                }
            }
        }
        out
    }
}

impl Validate for Tailwater {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.kind != TailwaterType::Constant {
            out.push(format!(
                "{prefix}Tailwater type '{}' is not supported. Configure a constant tailwater elevation.",
                self.kind.label()
            ));
        }
        if self.constant_elevation < self.invert_elevation {
            out.push(format!(
                "{prefix}Constant tailwater elevation must be greater than or equal to the invert elevation."
            ));
        }
        out
    }
}

impl Validate for Roadway {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !(self.width > 0.0) {
            out.push(format!("{prefix}Roadway width must be > 0."));
        }
        if self.stations.len() < 2 || self.elevations.len() < 2 {
            out.push(format!(
                "{prefix}Provide at least two roadway stations/elevations."
            ));
        }
        if self.stations.len() != self.elevations.len() {
            out.push(format!("{prefix}Stations and elevations counts must match."));
        }
        out
    }
}

impl Validate for Barrel {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !(self.span > 0.0) {
            out.push(format!("{prefix}Culvert span must be greater than zero."));
        }
        if !(self.rise > 0.0) {
            if self.shape == CulvertShape::Box {
                out.push(format!("{prefix}Box culverts must include a rise."));
            } else {
                out.push(format!("{prefix}Culvert rise must be greater than zero."));
            }
        }
        if self.number_of_barrels < 1 {
            out.push(format!("{prefix}Number of barrels must be >= 1."));
        }
        out
    }
}

impl Validate for Crossing {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        out.extend(self.flow.problems(&format!("{prefix}Flow: ")));
        out.extend(self.tailwater.problems(&format!("{prefix}Tailwater: ")));
        out.extend(self.roadway.problems(&format!("{prefix}Roadway: ")));
        if self.barrels.is_empty() {
            out.push(format!("{prefix}At least one culvert barrel is required."));
        }
        for (idx, barrel) in self.barrels.iter().enumerate() {
            let label = format!("{prefix}Culvert #{} ({}): ", idx + 1, barrel.name);
            out.extend(barrel.problems(&label));
        }
        if let Some(crest) = self.roadway.crest_elevation() {
            let tw = self.tailwater.constant_elevation;
            if tw >= crest {
                out.push(format!(
                    "{prefix}Constant tailwater elevation ({tw}) reaches or exceeds the roadway crest ({crest})."
                ));
            }
        }
        out
    }
}

impl Validate for Project {
    fn problems(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.crossings.is_empty() {
            out.push(format!("{prefix}At least one crossing is required."));
        }
        for (idx, crossing) in self.crossings.iter().enumerate() {
            let label = format!("{prefix}Crossing #{} ({}): ", idx + 1, crossing.name);
            out.extend(crossing.problems(&label));
        }
        out
    }
}

/// All invariant violations of the project, in document order.
pub fn collect_problems(project: &Project) -> Vec<String> {
    project.problems("")
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    let problems = collect_problems(project);
    if problems.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = problems.len(), "project failed validation");
        Err(ValidationError::Invariants { problems })
    }
}

/// Rejects configurations the solver automation cannot express, before any
/// invariant checks run.
pub fn check_supported(project: &Project) -> Result<(), ValidationError> {
    for crossing in &project.crossings {
        if !crossing.tailwater.is_constant() {
            return Err(ValidationError::Unsupported {
                feature: format!("tailwater type {}", crossing.tailwater.kind.label()),
                reason: format!(
                    "crossing '{}' must use a constant tailwater elevation",
                    crossing.name
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::RoadwaySurface;

    fn valid_crossing() -> Crossing {
        let mut crossing = Crossing::new("Main");
        crossing.flow = Flow::user_defined(vec![5.0, 10.0, 15.0]);
        crossing.tailwater = Tailwater::constant(100.5, 99.0);
        let mut roadway = Roadway::new(40.0, RoadwaySurface::Paved);
        roadway
            .add_point(0.0, 102.0)
            .add_point(50.0, 101.5)
            .add_point(100.0, 102.0);
        crossing.roadway = roadway;
        crossing.add_barrel(Barrel::circle("Pipe", 4.0).with_inverts(99.0, 98.5));
        crossing
    }

    #[test]
    fn valid_crossing_has_no_problems() {
        assert!(valid_crossing().problems("").is_empty());
    }

    #[test]
    fn decreasing_user_flows_are_rejected() {
        let flow = Flow::user_defined(vec![10.0, 5.0]);
        assert_eq!(
            flow.problems(""),
            vec!["User-defined flows must be strictly increasing.".to_string()]
        );
    }

    #[test]
    fn equal_min_and_design_are_rejected() {
        let flow = Flow::min_design_max(5.0, 5.0, 10.0);
        assert_eq!(
            flow.problems("Flow: "),
            vec!["Flow: Min/Design/Max must be strictly increasing.".to_string()]
        );
    }

    #[test]
    fn label_count_mismatch_is_reported() {
        let flow = Flow::labelled(vec![1.0, 2.0], vec!["a".into()]);
        assert_eq!(flow.problems("").len(), 1);
    }

    #[test]
    fn tailwater_at_crest_names_both_values() {
        let mut crossing = valid_crossing();
        crossing.tailwater.constant_elevation = 101.5;
        let problems = crossing.problems("");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("(101.5)"));
        assert!(problems[0].contains("roadway crest (101.5)"));
    }

    #[test]
    fn problems_are_collected_not_short_circuited() {
        let mut crossing = valid_crossing();
        crossing.roadway.width = 0.0;
        crossing.barrels[0].span = 0.0;
        crossing.barrels[0].number_of_barrels = 0;
        let mut project = Project::default();
        project.crossings.push(crossing);
        let problems = collect_problems(&project);
        assert_eq!(problems.len(), 3);
        assert_eq!(
            problems[0],
            "Crossing #1 (Main): Roadway: Roadway width must be > 0."
        );
        assert!(problems[1].starts_with("Crossing #1 (Main): Culvert #1 (Pipe): "));
    }

    #[test]
    fn box_without_rise_has_specific_message() {
        let barrel = Barrel::box_section("B", 6.0, 0.0);
        assert_eq!(barrel.problems(""), vec!["Box culverts must include a rise.".to_string()]);
    }

    #[test]
    fn empty_project_requires_a_crossing() {
        let err = validate_project(&Project::default()).unwrap_err();
        assert_eq!(err.problems(), vec!["At least one crossing is required.".to_string()]);
    }

    #[test]
    fn non_constant_tailwater_is_unsupported() {
        let mut crossing = valid_crossing();
        crossing.tailwater.kind = TailwaterType::Trapezoidal;
        let mut project = Project::default();
        project.crossings.push(crossing);
        let err = check_supported(&project).unwrap_err();
        assert!(matches!(err, ValidationError::Unsupported { .. }));
        assert!(err.to_string().contains("Trapezoidal channel"));
    }
}
