//! Carbon MRV command-line tool.
//!
//! Estimates carbon stock inside a project boundary from yearly land-cover
//! grids, compares years, verifies reported figures and checks overlap with
//! a reference layer. Results are printed to stdout as JSON; logs go to
//! stderr.

mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use carbon_engine::{CarbonEngine, ComparisonMetric, DirectoryGridSource, EngineConfig};

/// Session used for boundaries registered from the command line.
const CLI_SESSION: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "carbon-cli")]
#[command(about = "Carbon stock estimation and verification over land-cover grids")]
struct Args {
    /// Directory holding one land-cover grid file per year
    #[arg(long, default_value = "data/lulc", env = "CARBON_GRID_DIR")]
    grid_dir: PathBuf,

    /// Grid file name pattern; `{year}` is replaced by the year
    #[arg(long, default_value = carbon_engine::DEFAULT_GRID_PATTERN, env = "CARBON_GRID_PATTERN")]
    pattern: String,

    /// YAML configuration file (defaults and CARBON_* variables otherwise)
    #[arg(short, long, env = "CARBON_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a boundary and report its area and bounds
    Validate {
        /// GeoJSON or WKT boundary file
        boundary: PathBuf,
    },

    /// Carbon stock inside a boundary for one year
    Stock {
        boundary: PathBuf,
        #[arg(short, long)]
        year: i32,
    },

    /// Year-over-year growth, sequestration and credits
    Compare {
        boundary: PathBuf,
        /// Analysis years, each compared against the year before
        #[arg(short, long, value_delimiter = ',', required = true)]
        years: Vec<i32>,
    },

    /// Compare computed figures against a reported series
    Verify {
        boundary: PathBuf,
        #[arg(short, long, value_delimiter = ',', required = true)]
        years: Vec<i32>,
        /// JSON file: `{"2021": 12.3}` or `[{"year": 2021, "value": 12.3}]`
        #[arg(short, long)]
        reported: PathBuf,
        /// total_carbon, forest_growth or net_sequestration
        #[arg(short, long, default_value = "net_sequestration")]
        metric: String,
    },

    /// Overlap of a boundary with a reference layer
    Overlap {
        boundary: PathBuf,
        /// Reference boundary; omitted or invalid means no overlap
        #[arg(short, long)]
        reference: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::from_env(),
    };
    info!(
        grid_dir = %args.grid_dir.display(),
        leakage_factor = config.leakage_factor,
        "Loaded configuration"
    );

    let source = Arc::new(DirectoryGridSource::with_pattern(&args.grid_dir, &args.pattern));
    let engine = CarbonEngine::new(config, source)?;

    let outcome = match &args.command {
        Command::Validate { boundary } => {
            let payload = input::load_boundary_payload(boundary)?;
            let validation = engine.validate_boundary(&payload);
            if validation.valid {
                print_json(&engine.boundary_summary(&payload)?)
            } else {
                print_json(&validation)
            }
        }
        Command::Stock { boundary, year } => {
            let key = register(&engine, boundary)?;
            print_json(&engine.carbon_stock(CLI_SESSION, &key, *year)?)
        }
        Command::Compare { boundary, years } => {
            let key = register(&engine, boundary)?;
            print_json(&engine.compare_years(CLI_SESSION, &key, years)?)
        }
        Command::Verify {
            boundary,
            years,
            reported,
            metric,
        } => {
            let metric: ComparisonMetric = metric.parse()?;
            let reported = input::load_reported_series(reported)?;
            let key = register(&engine, boundary)?;
            engine.compare_years(CLI_SESSION, &key, years)?;
            print_json(&engine.verify(CLI_SESSION, &reported, metric)?)
        }
        Command::Overlap {
            boundary,
            reference,
        } => {
            let key = register(&engine, boundary)?;
            let reference = match reference {
                Some(path) => Some(input::load_boundary_payload(path)?),
                None => None,
            };
            print_json(&engine.overlap(CLI_SESSION, &key, reference.as_ref())?)
        }
    };

    let stats = engine.repository().stats();
    debug!(
        hit_rate = stats.hit_rate(),
        sessions = engine.repository().len(),
        "Session repository stats"
    );
    outcome
}

/// Register a boundary file in the CLI session and return its key.
fn register(engine: &CarbonEngine, path: &Path) -> Result<String> {
    let payload = input::load_boundary_payload(path)?;
    let id = input::boundary_id(path);
    let stored = engine
        .register_boundary(CLI_SESSION, Some(&id), None, &payload)
        .with_context(|| format!("Boundary {} rejected", path.display()))?;
    Ok(stored.id)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
