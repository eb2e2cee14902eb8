//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "basketcast")]
#[command(version)]
#[command(about = "Historical statistics and Monte Carlo forecasts for a weighted basket of stocks")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full forecast and print the report as JSON
    Simulate {
        #[command(flatten)]
        input: InputArgs,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base seed, overriding the request's `simulation.seed`
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        bridge: BridgeArgs,
    },

    /// Print only the historical metrics of the requested basket
    Metrics {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List the instruments in a price dataset
    Symbols {
        /// Path to the price CSV
        #[arg(short, long)]
        data: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Path to the price CSV (date, close and Name columns)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Path to the YAML request document
    #[arg(short, long)]
    pub request: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct BridgeArgs {
    /// Forecast program to run for ARIMA/GARCH refinement
    #[arg(long)]
    pub bridge_program: Option<PathBuf>,

    /// Argument passed to the forecast program before the JSON arguments (repeatable)
    #[arg(long = "bridge-arg", allow_hyphen_values = true)]
    pub bridge_args: Vec<String>,

    /// Seconds to wait for the forecast program
    #[arg(long, default_value_t = 60)]
    pub bridge_timeout_secs: u64,
}
