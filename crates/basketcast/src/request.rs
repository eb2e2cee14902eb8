//! Request documents
//!
//! A request is a YAML document with a `portfolio` and an optional
//! `simulation` section; see [`basketcast_core::config`] for every field.

use std::path::Path;

use basketcast_core::ForecastRequest;
use color_eyre::eyre::{Result, WrapErr};

pub fn parse_request(yaml: &str) -> Result<ForecastRequest, serde_saphyr::Error> {
    serde_saphyr::from_str(yaml)
}

/// Read and parse the request at `path`
pub fn load_request(path: &Path) -> Result<ForecastRequest> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read request {}", path.display()))?;
    let request = parse_request(&content)
        .wrap_err_with(|| format!("failed to parse request {}", path.display()))?;
    tracing::debug!(
        symbols = request.portfolio.symbols.len(),
        trials = request.simulation.simulation_count,
        years = request.simulation.forecast_years,
        "request loaded"
    );
    Ok(request)
}
