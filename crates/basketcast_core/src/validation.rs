use crate::config::{ForecastRequest, NormalSampler, SimulationConfig};
use crate::error::ValidationError;
use crate::model::{PortfolioSpec, PriceSeries};

/// Largest accepted number of Monte Carlo trials
pub const MAX_SIMULATION_COUNT: usize = 100_000;

/// Longest accepted forecast horizon in years
pub const MAX_FORECAST_YEARS: usize = 200;

type ValidationResult = Result<(), ValidationError>;

fn finite(field: &str, value: f64) -> ValidationResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new(field, "Must be a finite number"))
    }
}

fn non_negative(field: &str, value: f64) -> ValidationResult {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::new(field, "Cannot be negative"));
    }
    Ok(())
}

/// Validate the selected symbols and weights against the price data
pub fn validate_portfolio(portfolio: &PortfolioSpec, series: &PriceSeries) -> ValidationResult {
    if portfolio.symbols.is_empty() {
        return Err(ValidationError::new(
            "portfolio.symbols",
            "At least one symbol must be selected",
        ));
    }

    if let Some(missing) = portfolio
        .symbols
        .iter()
        .find(|s| !series.contains_symbol(s))
    {
        return Err(ValidationError::new(
            "portfolio.symbols",
            format!("Symbol '{missing}' does not appear in the price data"),
        ));
    }

    for (symbol, weight) in &portfolio.weights {
        if !portfolio.symbols.contains(symbol) {
            return Err(ValidationError::new(
                format!("portfolio.weights.{symbol}"),
                "Weight given for a symbol that is not selected",
            ));
        }
        finite(&format!("portfolio.weights.{symbol}"), *weight)?;
    }

    Ok(())
}

/// Validate the Monte Carlo settings
pub fn validate_simulation_config(config: &SimulationConfig) -> ValidationResult {
    finite("simulation.initial_investment", config.initial_investment)?;
    if config.initial_investment <= 0.0 {
        return Err(ValidationError::new(
            "simulation.initial_investment",
            "Initial investment must be positive",
        ));
    }

    if config.forecast_years == 0 {
        return Err(ValidationError::new(
            "simulation.forecast_years",
            "Forecast must cover at least 1 year",
        ));
    }
    if config.forecast_years > MAX_FORECAST_YEARS {
        return Err(ValidationError::new(
            "simulation.forecast_years",
            format!("Forecast cannot exceed {MAX_FORECAST_YEARS} years"),
        ));
    }

    if config.simulation_count == 0 {
        return Err(ValidationError::new(
            "simulation.simulation_count",
            "At least one trial is required",
        ));
    }
    if config.simulation_count > MAX_SIMULATION_COUNT {
        return Err(ValidationError::new(
            "simulation.simulation_count",
            format!("Cannot exceed {MAX_SIMULATION_COUNT} trials"),
        ));
    }

    non_negative("simulation.monthly_contribution", config.monthly_contribution)?;
    non_negative("simulation.yearly_contribution", config.yearly_contribution)?;
    finite("simulation.inflation_rate_pct", config.inflation_rate_pct)?;
    finite("simulation.expense_ratio_pct", config.expense_ratio_pct)?;

    if let Some(range) = config.date_range
        && let (Some(start), Some(end)) = (range.start, range.end)
        && start > end
    {
        return Err(ValidationError::new(
            "simulation.date_range",
            format!("Start {start} is after end {end}"),
        ));
    }

    if let NormalSampler::IrwinHall { terms: 0 } = config.sampler {
        return Err(ValidationError::new(
            "simulation.sampler.terms",
            "Irwin-Hall sampler needs at least one term",
        ));
    }

    finite("simulation.success_multiple", config.success_multiple)?;
    if config.success_multiple <= 0.0 {
        return Err(ValidationError::new(
            "simulation.success_multiple",
            "Success multiple must be positive",
        ));
    }

    Ok(())
}

/// Validate a whole request before any computation runs
pub fn validate_request(request: &ForecastRequest, series: &PriceSeries) -> ValidationResult {
    validate_portfolio(&request.portfolio, series)?;
    validate_simulation_config(&request.simulation)
}
