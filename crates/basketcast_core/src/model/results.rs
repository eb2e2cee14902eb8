//! Forecast outputs
//!
//! Everything here is produced once per request and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::config::ReservedSettings;
use crate::error::EngineError;

fn check(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::NonFinite { field, value })
    }
}

/// Risk and return statistics of the basket over its price history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMetrics {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline, as a fraction in [0, 1]
    pub max_drawdown: f64,
    /// Annualized 5th-percentile daily return
    pub var_95: f64,
    /// Number of valid daily returns behind the figures
    pub observations: usize,
    /// Base-100 index implied by the daily returns; empty when there are none
    pub synthetic_price_index: Vec<f64>,
}

impl HistoricalMetrics {
    pub fn ensure_finite(&self) -> Result<(), EngineError> {
        check("historical_metrics.annual_return", self.annual_return)?;
        check("historical_metrics.annual_volatility", self.annual_volatility)?;
        check("historical_metrics.sharpe_ratio", self.sharpe_ratio)?;
        check("historical_metrics.max_drawdown", self.max_drawdown)?;
        check("historical_metrics.var_95", self.var_95)?;
        for v in &self.synthetic_price_index {
            check("historical_metrics.synthetic_price_index", *v)?;
        }
        Ok(())
    }
}

/// Where the annual mean and volatility fed to the simulator came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelUsed {
    Historical,
    Refined,
}

/// Annualized statistics driving the simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualStatistics {
    pub mean_return: f64,
    pub volatility: f64,
}

impl AnnualStatistics {
    #[must_use]
    pub fn from_metrics(metrics: &HistoricalMetrics) -> Self {
        Self {
            mean_return: metrics.annual_return,
            volatility: metrics.annual_volatility,
        }
    }
}

/// Percentiles of the simulated portfolio value at one year of the horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub year: usize,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Summary of the final-value distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalValueSummary {
    pub trials: usize,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub mean: f64,
    /// Fraction of trials ending at or above `initial_investment * success_multiple`
    pub success_rate: f64,
    pub success_multiple: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Year 0 (the initial investment) followed by one point per forecast year.
    /// Empty when only final values were tracked.
    pub yearly_percentile_path: Vec<PercentilePoint>,
    pub final_values: FinalValueSummary,
    pub model_used: ModelUsed,
    /// Model description reported by the refinement step, if it ran
    pub model_label: Option<String>,
    pub total_contributed: f64,
}

impl SimulationResult {
    pub fn ensure_finite(&self) -> Result<(), EngineError> {
        for point in &self.yearly_percentile_path {
            check("simulation.yearly_percentile_path.median", point.median)?;
            check("simulation.yearly_percentile_path.p10", point.p10)?;
            check("simulation.yearly_percentile_path.p90", point.p90)?;
        }
        let f = &self.final_values;
        check("simulation.final_values.median", f.median)?;
        check("simulation.final_values.p10", f.p10)?;
        check("simulation.final_values.p90", f.p90)?;
        check("simulation.final_values.mean", f.mean)?;
        check("simulation.final_values.success_rate", f.success_rate)?;
        check("simulation.total_contributed", self.total_contributed)
    }
}

/// Everything returned to the caller for one forecast request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub historical_metrics: HistoricalMetrics,
    pub statistics: AnnualStatistics,
    pub simulation: SimulationResult,
    /// Echo of settings that were accepted but not applied
    pub reserved: ReservedSettings,
}

impl ForecastReport {
    pub fn ensure_finite(&self) -> Result<(), EngineError> {
        self.historical_metrics.ensure_finite()?;
        check("statistics.mean_return", self.statistics.mean_return)?;
        check("statistics.volatility", self.statistics.volatility)?;
        self.simulation.ensure_finite()
    }
}
