use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cf_app::{
    AppError, AppResult, CrossingResult, HydraulicQuery, RunOptions, SolverExecutable,
    SolverSwitch, project_service,
};
use cf_core::UnitSystem;
use cf_project::Project;
use cf_results::{ResultTable, read_detail, read_summary};
use cf_solver::{SearchConfig, SearchProgressEvent};

#[derive(Parser)]
#[command(name = "culvertflow")]
#[command(about = "culvertflow - HY-8 culvert crossing files and headwater queries", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Units {
    En,
    Si,
}

impl From<Units> for UnitSystem {
    fn from(units: Units) -> Self {
        match units {
            Units::En => UnitSystem::English,
            Units::Si => UnitSystem::Si,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project (.hy8, .yaml or .json)
    Validate {
        project_path: PathBuf,
    },
    /// Write the demo crossing project
    Demo {
        /// Output path; the extension selects the format
        output: PathBuf,
        #[arg(long, value_enum, default_value = "en")]
        units: Units,
        #[arg(long)]
        overwrite: bool,
    },
    /// Build a project from a JSON configuration document
    Build {
        config_path: PathBuf,
        output: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
    /// List the crossings of a project
    Inspect {
        project_path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Run the solver on a project file and print its results
    Run {
        project_path: PathBuf,
        /// Solver executable (otherwise environment, path file, default install)
        #[arg(long)]
        exe: Option<PathBuf>,
        /// Also write the profile plots
        #[arg(long, conflicts_with = "report")]
        plots: bool,
        /// Build the full report instead
        #[arg(long)]
        report: bool,
    },
    /// Print the results the solver left next to a project file
    Results {
        project_path: PathBuf,
        /// Only this crossing
        #[arg(long)]
        crossing: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Headwater elevation for a discharge
    Headwater {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long)]
        flow: f64,
    },
    /// Discharge producing a headwater elevation
    Flow {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long)]
        headwater: f64,
        /// First guess for the discharge
        #[arg(long)]
        hint: Option<f64>,
    },
    /// Discharge producing a headwater depth / barrel depth ratio
    Ratio {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long)]
        ratio: f64,
        #[arg(long)]
        hint: Option<f64>,
    },
    /// Show or store the solver executable path
    ExePath {
        /// Path to remember in the path file
        set: Option<PathBuf>,
    },
}

#[derive(Args)]
struct QueryArgs {
    project_path: PathBuf,
    /// Only this crossing (default: every crossing)
    #[arg(long)]
    crossing: Option<String>,
    #[arg(long)]
    exe: Option<PathBuf>,
    /// Scratch directory, kept after the run
    #[arg(long)]
    workspace: Option<PathBuf>,
    /// Keep the temporary scratch directory
    #[arg(long)]
    keep_files: bool,
    /// Crossings solved in parallel
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
    #[arg(long, default_value_t = SearchConfig::default().max_evaluations)]
    max_evaluations: usize,
    #[arg(long, default_value_t = SearchConfig::default().tolerance)]
    tolerance: f64,
    #[arg(long)]
    json: bool,
}

impl QueryArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            workspace: self.workspace.clone(),
            keep_files: self.keep_files,
            search: SearchConfig {
                max_evaluations: self.max_evaluations,
                tolerance: self.tolerance,
                ..SearchConfig::default()
            },
            concurrency: self.concurrency,
            ..RunOptions::default()
        }
    }
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Demo {
            output,
            units,
            overwrite,
        } => cmd_demo(&output, units.into(), overwrite),
        Commands::Build {
            config_path,
            output,
            overwrite,
        } => cmd_build(&config_path, &output, overwrite),
        Commands::Inspect { project_path, json } => cmd_inspect(&project_path, json),
        Commands::Run {
            project_path,
            exe,
            plots,
            report,
        } => {
            let switch = if report {
                SolverSwitch::BuildFullReport
            } else if plots {
                SolverSwitch::OpenRunSavePlots
            } else {
                SolverSwitch::OpenRunSave
            };
            cmd_run(&project_path, exe.as_deref(), &switch)
        }
        Commands::Results {
            project_path,
            crossing,
            json,
        } => cmd_results(&project_path, crossing.as_deref(), json),
        Commands::Headwater { query, flow } => {
            cmd_query(&query, HydraulicQuery::HeadwaterFromFlow { flow })
        }
        Commands::Flow {
            query,
            headwater,
            hint,
        } => cmd_query(&query, HydraulicQuery::FlowFromHeadwater { headwater, hint }),
        Commands::Ratio { query, ratio, hint } => {
            cmd_query(&query, HydraulicQuery::FlowForRatio { ratio, hint })
        }
        Commands::ExePath { set } => cmd_exe_path(set.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    let problems = project_service::validate_project(&project);
    if !problems.is_empty() {
        return Err(AppError::Validation { problems });
    }
    println!("✓ Project is valid ({} crossings)", project.crossings.len());
    Ok(())
}

fn cmd_demo(output: &Path, units: UnitSystem, overwrite: bool) -> AppResult<()> {
    let project = project_service::demo_project(units);
    let written = project_service::save_project(output, &project, overwrite)?;
    println!("✓ Wrote demo project to {}", written.display());
    Ok(())
}

fn cmd_build(config_path: &Path, output: &Path, overwrite: bool) -> AppResult<()> {
    let project = project_service::load_config_project(config_path)?;
    let written = project_service::save_project(output, &project, overwrite)?;
    println!(
        "✓ Built {} crossings into {}",
        project.crossings.len(),
        written.display()
    );
    Ok(())
}

fn cmd_inspect(project_path: &Path, json: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let crossings = project_service::list_crossings(&project);
    if json {
        println!("{}", to_json(&crossings)?);
        return Ok(());
    }

    println!("Project: {} ({:?} units)", project.display_title(), project.units);
    if crossings.is_empty() {
        println!("No crossings found in project");
    }
    for c in crossings {
        let crest = c
            .crest_elevation
            .map_or_else(|| "-".to_string(), |e| format!("{e:.3}"));
        println!(
            "  {} - {} flows {:?}, {} barrels, tailwater {:.3}, crest {}",
            c.name, c.flow_method, c.flows, c.barrels, c.tailwater_elevation, crest
        );
    }
    Ok(())
}

fn cmd_run(project_path: &Path, exe: Option<&Path>, switch: &SolverSwitch) -> AppResult<()> {
    let solver = SolverExecutable::locate(exe)?;
    println!("Running {} on {}", solver.path().display(), project_path.display());
    let output = solver.run(project_path, switch)?;
    println!("✓ Solver finished (exit code {:?})", output.exit_code);
    if matches!(
        switch,
        SolverSwitch::OpenRunSave | SolverSwitch::OpenRunSavePlots
    ) {
        cmd_results(project_path, None, false)?;
    }
    Ok(())
}

fn cmd_results(project_path: &Path, crossing: Option<&str>, json: bool) -> AppResult<()> {
    let summary = read_summary(&project_path.with_extension("rst"))?;
    let mut detail = read_detail(&project_path.with_extension("rsql"))?;
    let mut tables = Vec::new();
    for (name, series) in &summary {
        if crossing.is_some_and(|wanted| wanted != name) {
            continue;
        }
        let profiles = detail.remove(name).unwrap_or_default();
        tables.push((name.clone(), ResultTable::merge(series, &profiles)));
    }
    if let Some(wanted) = crossing
        && tables.is_empty()
    {
        return Err(AppError::CrossingNotFound {
            name: wanted.to_string(),
            what: format!("results for {}", project_path.display()),
        });
    }

    if json {
        let value: BTreeMap<&str, &ResultTable> = tables
            .iter()
            .map(|(name, table)| (name.as_str(), table))
            .collect();
        println!("{}", to_json(&value)?);
        return Ok(());
    }

    for (name, table) in tables {
        println!("\nCrossing: {name}");
        println!(
            "  {:>10} {:>10} {:>8} {:>8} {:>10}  {:<10} Iterations",
            "Flow", "Headwater", "HW/D", "Velocity", "Roadway Q", "Type"
        );
        for row in &table.rows {
            println!(
                "  {:>10.3} {:>10.3} {:>8.3} {:>8.3} {:>10.3}  {:<10} {}{}",
                row.flow,
                row.headwater_elevation,
                row.headwater_ratio,
                row.velocity,
                row.roadway_discharge,
                row.flow_type,
                row.iterations,
                if row.overtopping { "  (overtopping)" } else { "" }
            );
        }
        println!("  Max roadway discharge: {:.3}", table.roadway_max());
    }
    Ok(())
}

fn cmd_query(args: &QueryArgs, query: HydraulicQuery) -> AppResult<()> {
    let solver = SolverExecutable::locate(args.exe.as_deref())?;
    let project = project_service::load_project(&args.project_path)?;
    let options = args.options();

    let results = match &args.crossing {
        Some(name) => {
            let show_progress = !args.json;
            single_crossing(&solver, &project, name, &query, &options, show_progress)?
        }
        None => cf_app::run_project_query(&solver, &project, &query, &options)?,
    };

    if args.json {
        let value: Vec<serde_json::Value> = results
            .iter()
            .map(|(key, result)| outcome_json(key, result))
            .collect();
        println!("{}", to_json(&value)?);
        return Ok(());
    }

    for (key, result) in &results {
        let outcome = &result.outcome;
        println!("Crossing: {key}");
        if let Some(target) = outcome.requested_headwater {
            println!("  Target headwater: {target:.4}");
        }
        println!("  Flow:             {:.4}", outcome.flow);
        println!("  Headwater:        {:.4}", outcome.headwater);
        println!("  HW/D:             {:.4}", outcome.row.headwater_ratio);
        println!("  Outlet velocity:  {:.4}", outcome.row.velocity);
        if outcome.row.overtopping {
            println!("  Roadway overtops ({:.4})", outcome.row.roadway_discharge);
        }
        println!("  Solver runs:      {}", outcome.evaluations);
        if let Some(dir) = &result.workspace {
            println!("  Scratch files:    {}", dir.display());
        }
    }
    Ok(())
}

fn single_crossing(
    solver: &SolverExecutable,
    project: &Project,
    name: &str,
    query: &HydraulicQuery,
    options: &RunOptions,
    show_progress: bool,
) -> AppResult<Vec<(String, CrossingResult)>> {
    let crossing = project_service::get_crossing(project, name)?;
    let mut render = |event: SearchProgressEvent| render_progress(&mut io::stderr(), &event);
    let progress: Option<&mut dyn FnMut(SearchProgressEvent)> = if show_progress {
        Some(&mut render)
    } else {
        None
    };
    let result =
        cf_app::run_crossing_query(solver, crossing, Some(project), query, options, progress);
    if show_progress {
        clear_progress_line(&mut io::stderr());
    }
    Ok(vec![(crossing.name.clone(), result?)])
}

fn outcome_json(key: &str, result: &CrossingResult) -> serde_json::Value {
    let outcome = &result.outcome;
    serde_json::json!({
        "crossing": key,
        "requested_flow": outcome.requested_flow,
        "requested_headwater": outcome.requested_headwater,
        "flow": outcome.flow,
        "headwater": outcome.headwater,
        "row": outcome.row,
        "evaluations": outcome.evaluations,
        "workspace": result.workspace,
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Progress goes to stderr so stdout stays clean for `--json`.
fn clear_progress_line(out: &mut impl Write) {
    let _ = write!(out, "\r{}\r", " ".repeat(80));
    let _ = out.flush();
}

fn render_progress(out: &mut impl Write, event: &SearchProgressEvent) {
    let _ = write!(
        out,
        "\r{:?}  run={}  flow={:.4}  headwater={:.4}",
        event.stage, event.evaluation, event.flow, event.headwater
    );
    let _ = out.flush();
}

fn cmd_exe_path(set: Option<&Path>) -> AppResult<()> {
    let path_file = cf_app::default_path_file();
    if let Some(path) = set {
        let solver = SolverExecutable::new(path)?;
        let written = cf_app::persist_executable_path(&path_file, solver.path())?;
        println!("✓ Saved solver path to {}", written.display());
        return Ok(());
    }
    let resolved =
        cf_app::resolve_executable_path(None, |key| std::env::var(key).ok(), &path_file);
    let status = if resolved.exists() { "found" } else { "missing" };
    println!("{} ({status})", resolved.display());
    Ok(())
}
