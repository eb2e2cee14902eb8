//! Subcommand implementations
//!
//! Each command builds its result as a serializable value; [`run`] renders it
//! as pretty JSON to stdout or, for `simulate --output`, to a file.

use std::path::Path;
use std::time::Duration;

use basketcast_core::{
    ForecastBridge, ForecastReport, HistoricalMetrics, NoBridge, PriceCache, PriceSeries,
    ProcessBridge, SimulationControl, historical_metrics, run_forecast,
};
use color_eyre::eyre::Result;
use jiff::civil::Date;
use serde::Serialize;

use crate::cli::{BridgeArgs, Cli, Commands, InputArgs};
use crate::io::atomic_write;
use crate::request::load_request;

/// Overview of a price dataset
#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub days: usize,
    pub first_date: Option<Date>,
    pub last_date: Option<Date>,
    pub symbols: Vec<String>,
}

impl DatasetSummary {
    fn from_series(series: &PriceSeries) -> Self {
        Self {
            days: series.len(),
            first_date: series.first_date(),
            last_date: series.last_date(),
            symbols: series.symbols().to_vec(),
        }
    }
}

/// Bridge described by the command-line flags; none without `--bridge-program`
pub fn build_bridge(args: &BridgeArgs) -> Box<dyn ForecastBridge> {
    match &args.bridge_program {
        Some(program) => Box::new(
            ProcessBridge::new(program)
                .args(&args.bridge_args)
                .timeout(Duration::from_secs(args.bridge_timeout_secs)),
        ),
        None => Box::new(NoBridge),
    }
}

fn load_series(path: &Path) -> Result<std::sync::Arc<PriceSeries>> {
    Ok(PriceCache::new(path).get()?)
}

pub fn simulate(
    input: &InputArgs,
    seed: Option<u64>,
    bridge: &BridgeArgs,
) -> Result<ForecastReport> {
    let series = load_series(&input.data)?;
    let mut request = load_request(&input.request)?;
    if seed.is_some() {
        request.simulation.seed = seed;
    }

    let bridge = build_bridge(bridge);
    let control = SimulationControl::new();
    let report = run_forecast(&series, &request, bridge.as_ref(), Some(&control))?;
    tracing::debug!(trials = control.completed(), "simulation finished");
    Ok(report)
}

pub fn metrics(input: &InputArgs) -> Result<HistoricalMetrics> {
    let series = load_series(&input.data)?;
    let request = load_request(&input.request)?;
    Ok(historical_metrics(&series, &request)?)
}

pub fn symbols(data: &Path) -> Result<DatasetSummary> {
    let series = load_series(data)?;
    Ok(DatasetSummary::from_series(&series))
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            atomic_write(path, &json)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Execute the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Simulate {
            input,
            output,
            seed,
            bridge,
        } => emit(&simulate(&input, seed, &bridge)?, output.as_deref()),
        Commands::Metrics { input } => emit(&metrics(&input)?, None),
        Commands::Symbols { data } => emit(&symbols(&data)?, None),
    }
}
