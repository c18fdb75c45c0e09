//! # boq CLI
//!
//! Command-line front end for the floor plan BOQ engine.
//!
//! ```text
//! boq estimate --analysis response.json --area 1200 --unit sqft --pdf report.pdf
//! boq catalog
//! boq settings rate cement=420 steel=75
//! boq plans list
//! ```
//!
//! Settings and saved plans live under `--data-dir` (env `BOQ_DATA_DIR`),
//! one set of files per `--user` (env `BOQ_USER`). Logs go to stderr and are
//! filtered with `RUST_LOG`.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use boq_core::analysis_service::{AnalysisService, PlanUpload, RecordedAnalysisService};
use boq_core::calibration::AreaUnit;
use boq_core::errors::{EstimateError, EstimateResult};
use boq_core::file_io::{JsonFileStore, PlanStore, SavedPlan, SettingsStore};
use boq_core::pdf::TypstPdfExporter;
use boq_core::project::{parse_override, BrickSize, Overrides, SettingsSnapshot};
use boq_core::report::{ReportData, ReportExporter};
use boq_core::session::Session;

#[derive(Parser, Debug)]
#[command(name = "boq")]
#[command(version, about = "Floor plan bill of quantities and cost estimator")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args, Debug, Clone)]
struct GlobalOpts {
    /// Directory holding saved settings and plans
    #[arg(long, global = true, env = "BOQ_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Profile the settings and plans belong to
    #[arg(long, global = true, env = "BOQ_USER", default_value = "local")]
    user: String,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Price an analysed floor plan
    Estimate(EstimateArgs),

    /// Show the material catalog and the rates in effect
    Catalog {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Saved project settings and overrides
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Floor plans saved to the profile
    #[command(subcommand)]
    Plans(PlanCommands),
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Analysis service response (JSON) for the plan
    #[arg(long, value_name = "FILE")]
    analysis: PathBuf,

    /// The plan image or PDF the analysis was made from
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,

    /// Actual built-up area to calibrate to
    #[arg(long)]
    area: Option<String>,

    /// Unit of --area
    #[arg(long, default_value = "sqm")]
    unit: AreaUnit,

    /// Floor-to-ceiling height in metres
    #[arg(long, value_name = "M")]
    wall_height: Option<f64>,

    /// Currency code for display
    #[arg(long, value_name = "CODE")]
    currency: Option<String>,

    #[arg(long)]
    brick_size: Option<BrickSize>,

    /// Rate override for this run, e.g. cement=420
    #[arg(long = "rate", value_name = "ID=VALUE")]
    rates: Vec<String>,

    /// Project quantity override for this run, e.g. bricks=18000
    #[arg(long = "quantity", value_name = "ID=VALUE")]
    quantities: Vec<String>,

    /// Ignore the settings saved for the user
    #[arg(long)]
    no_saved_settings: bool,

    /// Print the full estimate as JSON
    #[arg(long)]
    json: bool,

    /// Also write a PDF report
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,

    /// Save the plan and its priced report to the profile
    #[arg(long)]
    save_plan: bool,
}

#[derive(Subcommand, Debug)]
enum SettingsCommands {
    /// Print the saved settings
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Change project settings
    Set {
        #[arg(long, value_name = "CODE")]
        currency: Option<String>,
        #[arg(long, value_name = "M")]
        wall_height: Option<f64>,
        #[arg(long)]
        brick_size: Option<BrickSize>,
    },

    /// Set or clear custom rates
    Rate {
        /// Entries of the form id=value
        #[arg(value_name = "ID=VALUE")]
        entries: Vec<String>,
        /// Material ids whose custom rate should be removed
        #[arg(long, value_name = "ID")]
        clear: Vec<String>,
    },

    /// Set or clear custom project quantities
    Quantity {
        #[arg(value_name = "ID=VALUE")]
        entries: Vec<String>,
        #[arg(long, value_name = "ID")]
        clear: Vec<String>,
    },

    /// Remove every rate and quantity override
    ClearOverrides,
}

#[derive(Subcommand, Debug)]
enum PlanCommands {
    /// List saved plans, newest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved plan
    Delete { id: Uuid },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{json}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn data_dir(global: &GlobalOpts) -> PathBuf {
    global.data_dir.clone().unwrap_or_else(|| {
        directories::ProjectDirs::from("", "", "boq")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".boq"))
    })
}

fn run(cli: Cli) -> EstimateResult<()> {
    let store = JsonFileStore::new(data_dir(&cli.global));
    let user = cli.global.user.as_str();
    debug!(dir = %store.dir().display(), user, "using store");

    match cli.command {
        Commands::Estimate(args) => estimate(&store, user, args),
        Commands::Catalog { json } => catalog(&store, user, json),
        Commands::Settings(cmd) => settings(&store, user, cmd),
        Commands::Plans(cmd) => plans(&store, user, cmd),
    }
}

fn parse_all(entries: &[String]) -> EstimateResult<Vec<(String, f64)>> {
    entries.iter().map(|e| parse_override(e)).collect()
}

fn estimate(store: &JsonFileStore, user: &str, args: EstimateArgs) -> EstimateResult<()> {
    let saved = if args.no_saved_settings {
        SettingsSnapshot::default()
    } else {
        store.fetch(user)?
    };
    let mut session = Session::with_snapshot(&saved);

    // Run-only overrides on top of the saved ones
    let mut run_overrides = Overrides::default();
    for (id, rate) in parse_all(&args.rates)? {
        run_overrides.set_rate(id, rate);
    }
    for (id, qty) in parse_all(&args.quantities)? {
        run_overrides.set_quantity(id, qty);
    }
    let merged = session.overrides().merged_with(&run_overrides);
    session.apply_snapshot(&SettingsSnapshot {
        project_settings: None,
        custom_rates: Some(merged.custom_rates),
        custom_quantities: Some(merged.custom_quantities),
    });

    let mut settings = session.settings().clone();
    if let Some(h) = args.wall_height {
        settings.wall_height_m = h;
    }
    if let Some(code) = &args.currency {
        settings.currency = code.trim().to_ascii_uppercase();
    }
    if let Some(size) = args.brick_size {
        settings.brick_size = size;
    }
    settings.validate()?;
    session.set_settings(settings);

    let upload = match &args.plan {
        Some(path) => {
            let upload = PlanUpload::from_path(path)?;
            upload.validate()?;
            upload
        }
        None => PlanUpload::new(file_label(&args.analysis), "application/json", Vec::new()),
    };

    session.set_unit(args.unit);
    let service = RecordedAnalysisService::new(&args.analysis);
    let ticket = session.begin_analysis();
    session.complete_analysis(ticket, service.analyze(&upload))?;
    if let Some(area) = &args.area {
        session.set_calibration_input(area.clone());
    }

    let inputs = session.inputs().ok_or_else(|| EstimateError::Internal {
        message: "analysis was applied but the session has no plan".to_string(),
    })?;
    let estimate = session.estimate().cloned().ok_or_else(|| EstimateError::Internal {
        message: "no estimate available".to_string(),
    })?;
    let report = ReportData::from_estimate(&estimate, &inputs, Some(upload.file_name.as_str()));

    if args.json {
        let json = serde_json::to_string_pretty(&estimate).map_err(EstimateError::serialization)?;
        println!("{json}");
    } else {
        render::print_estimate(&estimate, &inputs, &report);
    }

    if let Some(path) = &args.pdf {
        let bytes = TypstPdfExporter.export(&report)?;
        std::fs::write(path, bytes).map_err(|e| {
            EstimateError::file_error("write report", path.display().to_string(), e.to_string())
        })?;
        info!(path = %path.display(), "report written");
        if !args.json {
            println!("Report written to {}", path.display());
        }
    }

    if args.save_plan {
        let plan = SavedPlan::new(upload.file_name.clone(), inputs.raw.clone(), Some(report));
        let id = store.save_plan(user, plan)?;
        if !args.json {
            println!("Plan saved as {id}");
        }
    }

    Ok(())
}

fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn catalog(store: &JsonFileStore, user: &str, json: bool) -> EstimateResult<()> {
    let saved = store.fetch(user)?;
    let custom = saved.custom_rates.unwrap_or_default();

    if json {
        let rows: Vec<_> = boq_core::catalog::all()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "name": m.name,
                    "unit": m.unit,
                    "category": m.category,
                    "bucket": m.bucket,
                    "defaultRate": m.default_rate,
                    "effectiveRate": custom.get(m.id).copied().unwrap_or(m.default_rate),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&rows).map_err(EstimateError::serialization)?;
        println!("{text}");
    } else {
        render::print_catalog(&custom);
    }
    Ok(())
}

fn settings(store: &JsonFileStore, user: &str, cmd: SettingsCommands) -> EstimateResult<()> {
    let mut session = Session::with_snapshot(&store.fetch(user)?);

    match cmd {
        SettingsCommands::Show { json } => {
            let snapshot = session.snapshot();
            if json {
                let text = serde_json::to_string_pretty(&snapshot).map_err(EstimateError::serialization)?;
                println!("{text}");
            } else {
                render::print_settings(session.settings(), session.overrides());
            }
            return Ok(());
        }
        SettingsCommands::Set {
            currency,
            wall_height,
            brick_size,
        } => {
            let mut settings = session.settings().clone();
            if let Some(code) = currency {
                settings.currency = code.trim().to_ascii_uppercase();
            }
            if let Some(h) = wall_height {
                settings.wall_height_m = h;
            }
            if let Some(size) = brick_size {
                settings.brick_size = size;
            }
            settings.validate()?;
            session.set_settings(settings);
        }
        SettingsCommands::Rate { entries, clear } => {
            for (id, rate) in parse_all(&entries)? {
                session.set_rate(id, rate);
            }
            for id in &clear {
                session.clear_rate(id);
            }
        }
        SettingsCommands::Quantity { entries, clear } => {
            for (id, qty) in parse_all(&entries)? {
                session.set_quantity(id, qty);
            }
            for id in &clear {
                session.clear_quantity(id);
            }
        }
        SettingsCommands::ClearOverrides => {
            session.apply_snapshot(&SettingsSnapshot {
                project_settings: None,
                custom_rates: Some(Default::default()),
                custom_quantities: Some(Default::default()),
            });
        }
    }

    let ack = store.save(user, &session.snapshot())?;
    println!("Settings saved for '{}' at {}", ack.user_key, ack.updated_at.to_rfc3339());
    Ok(())
}

fn plans(store: &JsonFileStore, user: &str, cmd: PlanCommands) -> EstimateResult<()> {
    match cmd {
        PlanCommands::List { json } => {
            let plans = store.list_plans(user)?;
            if json {
                let text = serde_json::to_string_pretty(&plans).map_err(EstimateError::serialization)?;
                println!("{text}");
            } else {
                render::print_plans(&plans);
            }
        }
        PlanCommands::Delete { id } => {
            let removed = store.delete_plan(user, id)?;
            println!("Deleted {} ({})", removed.id, removed.file_name);
        }
    }
    Ok(())
}
