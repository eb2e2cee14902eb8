//! End-to-end forecast of one request
//!
//! validate -> historical metrics -> optional refinement -> Monte Carlo ->
//! aggregation. The price series is only read.

use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::bridge::{ForecastBridge, choose_statistics};
use crate::config::ForecastRequest;
use crate::error::EngineError;
use crate::metrics::compute_metrics;
use crate::model::{AnnualStatistics, ForecastReport, HistoricalMetrics, PriceRow, PriceSeries};
use crate::simulation::{SimulationControl, simulate};
use crate::validation::validate_request;

/// Rows of `series` inside the request's date range
fn history<'a>(series: &'a PriceSeries, request: &ForecastRequest) -> &'a [PriceRow] {
    match request.simulation.date_range {
        Some(range) => series.range(range.start, range.end),
        None => series.rows(),
    }
}

/// Historical statistics only, without running the simulation
pub fn historical_metrics(
    series: &PriceSeries,
    request: &ForecastRequest,
) -> Result<HistoricalMetrics, EngineError> {
    validate_request(request, series)?;
    let metrics = compute_metrics(
        history(series, request),
        &request.portfolio,
        request.simulation.initial_investment,
    );
    metrics.ensure_finite()?;
    Ok(metrics)
}

/// Run the full forecast pipeline for `request`.
///
/// Bridge failures never surface here; they degrade to the historical
/// statistics. Errors are limited to invalid requests, cancellation and
/// non-finite results.
pub fn run_forecast(
    series: &PriceSeries,
    request: &ForecastRequest,
    bridge: &dyn ForecastBridge,
    control: Option<&SimulationControl>,
) -> Result<ForecastReport, EngineError> {
    validate_request(request, series)?;
    let config = &request.simulation;

    let rows = history(series, request);
    let metrics = compute_metrics(rows, &request.portfolio, config.initial_investment);
    info!(
        days = rows.len(),
        observations = metrics.observations,
        annual_return = metrics.annual_return,
        annual_volatility = metrics.annual_volatility,
        "historical metrics computed"
    );

    let chosen = choose_statistics(
        bridge,
        &metrics.synthetic_price_index,
        config.forecast_model.as_ref(),
        AnnualStatistics::from_metrics(&metrics),
    );

    let trials = simulate(chosen.statistics, config, control)?;
    let simulation = aggregate(&trials, config, chosen.model_used, chosen.model_label);
    info!(
        trials = simulation.final_values.trials,
        median = simulation.final_values.median,
        success_rate = simulation.final_values.success_rate,
        seed = trials.seed,
        "forecast complete"
    );

    let reserved = config.reserved_settings();
    if !reserved.is_empty() {
        debug!(?reserved, "reserved settings accepted but not applied");
    }

    let report = ForecastReport {
        historical_metrics: metrics,
        statistics: chosen.statistics,
        simulation,
        reserved,
    };
    report.ensure_finite()?;
    Ok(report)
}
