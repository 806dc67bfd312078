//! Service-layer tests against an in-process fake solver.
//!
//! The fake reads the scratch project file it is handed, evaluates a synthetic
//! headwater curve for every flow in it and writes summary/detail reports the
//! way the real solver does.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cf_app::{
    AppError, AppResult, HydraulicQuery, ProcessOutput, RunOptions, SolverInvoker, SolverSwitch,
    demo_project, run_crossing_query, run_project_query,
};
use cf_core::UnitSystem;
use cf_project::Project;
use cf_results::load_manifest;
use cf_solver::SolverError;

const INVERT: f64 = 99.0;
const DIAMETER: f64 = 4.0;

struct FakeSolver {
    curve: fn(f64) -> f64,
    exit_code: i32,
    write_reports: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeSolver {
    fn new(curve: fn(f64) -> f64) -> Self {
        Self {
            curve,
            exit_code: 0,
            write_reports: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    fn emit_reports(&self, project_file: &Path) -> AppResult<()> {
        let project = cf_codec::read_project(project_file)?;
        let mut rst = String::new();
        let mut rsql = String::new();
        for crossing in &project.crossings {
            let flows = crossing.flow.sequence();
            let heads: Vec<f64> = flows.iter().map(|q| (self.curve)(*q)).collect();
            let cells = |values: &[f64]| {
                values
                    .iter()
                    .map(|v| format!(", {v}"))
                    .collect::<String>()
            };
            writeln!(rst, "Dialog:  Summary of Flows at Crossing - {}", crossing.name).unwrap();
            writeln!(rst, "Roadway Discharge (cfs){}", cells(&vec![0.0; flows.len()])).unwrap();
            writeln!(rst, "Dialog:  Culvert Summary Table - Barrel 1").unwrap();
            writeln!(rst, "Total Discharge (cfs){}", cells(&flows)).unwrap();
            writeln!(rst, "Headwater Elevation (ft){}", cells(&heads)).unwrap();
            writeln!(rst, "Outlet Velocity (ft/s){}", cells(&vec![3.0; flows.len()])).unwrap();

            writeln!(rsql, "Crossing: {}", crossing.name).unwrap();
            for (idx, (q, hw)) in flows.iter().zip(&heads).enumerate() {
                writeln!(rsql, "FlowProfileName: Flow {}", idx + 1).unwrap();
                writeln!(rsql, "FlowProfileFlow: {q}").unwrap();
                writeln!(rsql, "HeadwaterToDepth: {}", (hw - INVERT) / DIAMETER).unwrap();
                writeln!(rsql, "FlowType: 1-S2n").unwrap();
                writeln!(rsql, "Overtops: False").unwrap();
                writeln!(rsql, "EndFlowProfile").unwrap();
            }
        }
        std::fs::write(project_file.with_extension("rst"), rst)?;
        std::fs::write(project_file.with_extension("rsql"), rsql)?;
        Ok(())
    }
}

impl SolverInvoker for FakeSolver {
    fn invoke(&self, project_file: &Path, switch: &SolverSwitch) -> AppResult<ProcessOutput> {
        assert_eq!(switch, &SolverSwitch::OpenRunSave);
        self.calls.lock().unwrap().push(project_file.to_path_buf());
        if self.exit_code != 0 {
            return Ok(ProcessOutput {
                exit_code: Some(self.exit_code),
                stdout: "opening project\n".to_string(),
                stderr: "license check failed\n".to_string(),
            });
        }
        if self.write_reports {
            self.emit_reports(project_file)?;
        }
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    }
}

fn sqrt_curve(q: f64) -> f64 {
    INVERT + 2.0 * q.sqrt()
}

fn capped_curve(q: f64) -> f64 {
    INVERT + 0.25 * q.min(20.0)
}

fn in_dir(dir: &Path) -> RunOptions {
    RunOptions {
        workspace: Some(dir.to_path_buf()),
        ..RunOptions::default()
    }
}

#[test]
fn forward_query_writes_named_scratch_file_and_journal() {
    let dir = tempfile::tempdir().unwrap();
    let project = demo_project(UnitSystem::English);
    let solver = FakeSolver::new(sqrt_curve);

    let result = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::HeadwaterFromFlow { flow: 16.0 },
        &in_dir(dir.path()),
        None,
    )
    .unwrap();

    assert_eq!(result.outcome.headwater, 107.0);
    assert_eq!(result.outcome.row.headwater_ratio, 2.0);
    assert_eq!(result.outcome.row.flow_type, "1-S2n");
    assert_eq!(result.workspace.as_deref(), Some(dir.path()));

    let scratch = dir.path().join("Demo_Culvert_run_001.hy8");
    assert_eq!(solver.calls(), vec![scratch.clone()]);
    assert!(scratch.with_extension("rst").exists());

    let manifest = load_manifest(dir.path()).unwrap();
    assert_eq!(manifest.crossing, "Demo Culvert");
    assert_eq!(manifest.evaluations.len(), 1);
    assert_eq!(manifest.evaluations[0].headwater, Some(107.0));
    assert_eq!(manifest.evaluations[0].project_file, "Demo_Culvert_run_001.hy8");
}

#[test]
fn inverse_query_converges_with_unique_scratch_files() {
    let dir = tempfile::tempdir().unwrap();
    let project = demo_project(UnitSystem::English);
    let before = project.clone();
    let solver = FakeSolver::new(sqrt_curve);
    let options = in_dir(dir.path());

    let result = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::FlowFromHeadwater {
            headwater: 105.0,
            hint: None,
        },
        &options,
        None,
    )
    .unwrap();

    assert!((result.outcome.headwater - 105.0).abs() <= options.search.tolerance);
    assert!((result.outcome.flow - 9.0).abs() < 1e-2);
    let calls = solver.calls();
    assert_eq!(calls.len(), result.outcome.evaluations);
    for (idx, path) in calls.iter().enumerate() {
        let expected = format!("Demo_Culvert_run_{:03}.hy8", idx + 1);
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        assert!(path.exists());
    }
    assert_eq!(project, before);
}

#[test]
fn ratio_query_reports_target_headwater() {
    let project = demo_project(UnitSystem::English);
    let solver = FakeSolver::new(sqrt_curve);
    let result = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::FlowForRatio {
            ratio: 1.5,
            hint: Some(9.0),
        },
        &RunOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(result.outcome.requested_headwater, Some(105.0));
    assert!((result.outcome.headwater - 105.0).abs() <= 1e-4);
}

#[test]
fn temporary_workspace_is_cleaned_up_unless_kept() {
    let project = demo_project(UnitSystem::English);
    let query = HydraulicQuery::HeadwaterFromFlow { flow: 4.0 };

    let solver = FakeSolver::new(sqrt_curve);
    let result = run_crossing_query(
        &solver,
        &project.crossings[0],
        None,
        &query,
        &RunOptions::default(),
        None,
    )
    .unwrap();
    assert!(result.workspace.is_none());
    let scratch_dir = solver.calls()[0].parent().unwrap().to_path_buf();
    assert!(!scratch_dir.exists());

    let solver = FakeSolver::new(sqrt_curve);
    let options = RunOptions {
        keep_files: true,
        ..RunOptions::default()
    };
    let result = run_crossing_query(&solver, &project.crossings[0], None, &query, &options, None)
        .unwrap();
    let kept = result.workspace.unwrap();
    assert!(kept.join("Demo_Culvert_run_001.hy8").exists());
    assert!(load_manifest(&kept).is_ok());
    std::fs::remove_dir_all(kept).unwrap();
}

#[test]
fn failing_solver_reports_exit_code_and_output() {
    let project = demo_project(UnitSystem::English);
    let solver = FakeSolver {
        exit_code: 3,
        ..FakeSolver::new(sqrt_curve)
    };
    let err = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::HeadwaterFromFlow { flow: 4.0 },
        &RunOptions::default(),
        None,
    )
    .unwrap_err();
    match err {
        AppError::SolverInvocation {
            exit_code,
            stderr_tail,
            stdout_tail,
            ..
        } => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr_tail, "license check failed");
            assert_eq!(stdout_tail, "opening project");
        }
        other => panic!("expected invocation error, got {other:?}"),
    }
    assert_eq!(solver.calls().len(), 1);
}

#[test]
fn missing_summary_is_an_invocation_failure() {
    let project = demo_project(UnitSystem::English);
    let solver = FakeSolver {
        write_reports: false,
        ..FakeSolver::new(sqrt_curve)
    };
    let err = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::HeadwaterFromFlow { flow: 4.0 },
        &RunOptions::default(),
        None,
    )
    .unwrap_err();
    assert!(
        matches!(&err, AppError::SolverInvocation { message, .. } if message.contains("was not produced")),
        "{err}"
    );
}

#[test]
fn stale_report_in_reused_workspace_is_not_read() {
    let dir = tempfile::tempdir().unwrap();
    let project = demo_project(UnitSystem::English);
    let query = HydraulicQuery::HeadwaterFromFlow { flow: 4.0 };

    let solver = FakeSolver::new(sqrt_curve);
    run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &query,
        &in_dir(dir.path()),
        None,
    )
    .unwrap();
    let stale = dir.path().join("Demo_Culvert_run_001.rst");
    assert!(stale.exists());

    let silent = FakeSolver {
        write_reports: false,
        ..FakeSolver::new(sqrt_curve)
    };
    let err = run_crossing_query(
        &silent,
        &project.crossings[0],
        Some(&project),
        &query,
        &in_dir(dir.path()),
        None,
    )
    .unwrap_err();
    assert!(
        matches!(&err, AppError::SolverInvocation { message, .. } if message.contains("was not produced")),
        "{err}"
    );
    assert!(!stale.exists());
    assert!(!dir.path().join("Demo_Culvert_run_001.rsql").exists());
}

#[test]
fn capacity_limit_surfaces_as_search_error() {
    let project = demo_project(UnitSystem::English);
    let solver = FakeSolver::new(capped_curve);
    let err = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::FlowFromHeadwater {
            headwater: 110.0,
            hint: None,
        },
        &RunOptions::default(),
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Solver(SolverError::CapacityExceeded { .. })
    ));
    assert!(solver.calls().len() < RunOptions::default().search.max_evaluations);
}

#[test]
fn invalid_crossing_is_rejected_before_running() {
    let mut project = demo_project(UnitSystem::English);
    project.crossings[0].tailwater.constant_elevation = 150.0;
    let solver = FakeSolver::new(sqrt_curve);
    let err = run_crossing_query(
        &solver,
        &project.crossings[0],
        Some(&project),
        &HydraulicQuery::HeadwaterFromFlow { flow: 4.0 },
        &RunOptions::default(),
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("roadway crest"), "{err}");
    assert!(solver.calls().is_empty());
}

fn three_crossing_project() -> Project {
    let mut project = demo_project(UnitSystem::English);
    let twin = project.crossings[0].clone();
    project.add_crossing(twin);
    let mut side = project.crossings[0].clone();
    side.name = "Side Road".to_string();
    project.add_crossing(side);
    project
}

#[test]
fn project_batch_keys_duplicates_and_uses_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    let project = three_crossing_project();
    let solver = FakeSolver::new(sqrt_curve);
    let options = RunOptions {
        concurrency: 2,
        ..in_dir(dir.path())
    };

    let results = run_project_query(
        &solver,
        &project,
        &HydraulicQuery::HeadwaterFromFlow { flow: 16.0 },
        &options,
    )
    .unwrap();

    let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["Demo Culvert", "Demo Culvert (duplicate #2)", "Side Road"]
    );
    for (idx, (_, result)) in results.iter().enumerate() {
        let sub = dir.path().join(format!("crossing_{:03}", idx + 1));
        assert_eq!(result.workspace.as_deref(), Some(sub.as_path()));
        assert_eq!(result.outcome.headwater, 107.0);
    }
    assert!(dir.path().join("crossing_003").join("Side_Road_run_001.hy8").exists());
    assert_eq!(solver.calls().len(), 3);
}

#[test]
fn project_batch_fails_on_first_failing_crossing() {
    let project = three_crossing_project();
    let solver = FakeSolver {
        write_reports: false,
        ..FakeSolver::new(sqrt_curve)
    };
    let err = run_project_query(
        &solver,
        &project,
        &HydraulicQuery::HeadwaterFromFlow { flow: 16.0 },
        &RunOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::SolverInvocation { .. }));
}
