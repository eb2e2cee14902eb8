//! Forecast request configuration
//!
//! The main configuration type is [`SimulationConfig`], which holds everything
//! the Monte Carlo run needs besides the return statistics. A
//! [`ForecastRequest`] pairs it with the [`PortfolioSpec`] being forecast and
//! is what the front end deserializes from a request document.
//!
//! ```ignore
//! let request: ForecastRequest = serde_saphyr::from_str(r#"
//! portfolio:
//!   symbols: [AAPL, MSFT]
//!   weights: { AAPL: 0.6, MSFT: 0.4 }
//! simulation:
//!   initial_investment: 10000
//!   forecast_years: 10
//!   investment_type: monthly
//!   monthly_contribution: 500
//! "#)?;
//! ```

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::model::PortfolioSpec;

fn default_initial_investment() -> f64 {
    10_000.0
}

fn default_forecast_years() -> usize {
    10
}

fn default_simulation_count() -> usize {
    1_000
}

fn default_success_multiple() -> f64 {
    2.0
}

/// How new money enters the portfolio during the forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentType {
    /// Only the initial investment, no further contributions
    #[default]
    #[serde(alias = "lump_sum")]
    Lumpsum,
    /// `monthly_contribution` twelve times per year
    Monthly,
    /// `yearly_contribution` once per year
    Yearly,
}

/// Construction of the standard normal deviate drawn each simulated year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalSampler {
    /// Sum of `terms` uniforms, centred and scaled to unit variance.
    ///
    /// Fewer terms is faster but has thinner tails; 12 is the classic choice.
    IrwinHall { terms: u32 },
    /// Exact standard normal
    Gaussian,
}

impl Default for NormalSampler {
    fn default() -> Self {
        NormalSampler::IrwinHall { terms: 12 }
    }
}

/// How much of each trial is retained for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTracking {
    /// Keep every (trial, year) value; enables the yearly percentile path
    #[default]
    Full,
    /// Keep final values only; the yearly path is left empty
    FinalOnly,
}

/// ARIMA(p, d, q) order passed to the external forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: u32,
    pub d: u32,
    pub q: u32,
}

/// GARCH(p, q) order passed to the external forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarchOrder {
    pub p: u32,
    pub q: u32,
}

impl Default for GarchOrder {
    fn default() -> Self {
        Self { p: 1, q: 1 }
    }
}

/// Model orders for the refinement step. Refinement runs only when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForecastModel {
    #[serde(default)]
    pub arima_order: Option<ArimaOrder>,
    #[serde(default)]
    pub garch_order: Option<GarchOrder>,
}

impl ForecastModel {
    #[must_use]
    pub fn new(arima_order: ArimaOrder, garch_order: GarchOrder) -> Self {
        Self {
            arima_order: Some(arima_order),
            garch_order: Some(garch_order),
        }
    }

    /// Both orders, if both were supplied
    #[must_use]
    pub fn orders(&self) -> Option<(ArimaOrder, GarchOrder)> {
        self.arima_order.zip(self.garch_order)
    }
}

/// Inclusive history window used for the historical statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<Date>,
    #[serde(default)]
    pub end: Option<Date>,
}

/// Settings accepted for compatibility but not applied by any calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedSettings {
    pub rebalance_frequency: Option<String>,
    pub tax_rate_pct: Option<f64>,
    pub confidence_level: Option<f64>,
}

impl ReservedSettings {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rebalance_frequency.is_none()
            && self.tax_rate_pct.is_none()
            && self.confidence_level.is_none()
    }
}

/// Monte Carlo run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    #[serde(default = "default_initial_investment")]
    pub initial_investment: f64,
    #[serde(default = "default_forecast_years")]
    pub forecast_years: usize,
    #[serde(default = "default_simulation_count")]
    pub simulation_count: usize,
    pub investment_type: InvestmentType,
    pub monthly_contribution: f64,
    pub yearly_contribution: f64,
    /// Annual inflation in percent, subtracted from every simulated year's return
    pub inflation_rate_pct: f64,
    /// Annual fund expenses in percent, subtracted like inflation
    pub expense_ratio_pct: f64,
    pub date_range: Option<DateRange>,
    pub forecast_model: Option<ForecastModel>,

    /// Base seed; each trial derives its own generator from it.
    /// `None` draws a fresh seed per run.
    pub seed: Option<u64>,
    pub sampler: NormalSampler,
    pub path_tracking: PathTracking,
    /// A trial succeeds when its final value reaches
    /// `initial_investment * success_multiple`
    #[serde(default = "default_success_multiple")]
    pub success_multiple: f64,

    // Reserved: accepted, echoed back, never applied
    pub rebalance_frequency: Option<String>,
    pub tax_rate_pct: Option<f64>,
    pub confidence_level: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_investment: default_initial_investment(),
            forecast_years: default_forecast_years(),
            simulation_count: default_simulation_count(),
            investment_type: InvestmentType::Lumpsum,
            monthly_contribution: 0.0,
            yearly_contribution: 0.0,
            inflation_rate_pct: 0.0,
            expense_ratio_pct: 0.0,
            date_range: None,
            forecast_model: None,
            seed: None,
            sampler: NormalSampler::default(),
            path_tracking: PathTracking::Full,
            success_multiple: default_success_multiple(),
            rebalance_frequency: None,
            tax_rate_pct: None,
            confidence_level: None,
        }
    }
}

impl SimulationConfig {
    /// Real-terms drag subtracted from every simulated annual return
    #[must_use]
    pub fn annual_drag(&self) -> f64 {
        self.inflation_rate_pct / 100.0 + self.expense_ratio_pct / 100.0
    }

    /// New money added in a simulated year, before the mid-year growth adjustment
    #[must_use]
    pub fn annual_contribution(&self) -> f64 {
        match self.investment_type {
            InvestmentType::Lumpsum => 0.0,
            InvestmentType::Monthly => self.monthly_contribution * 12.0,
            InvestmentType::Yearly => self.yearly_contribution,
        }
    }

    /// Initial investment plus every scheduled contribution
    #[must_use]
    pub fn total_contributed(&self) -> f64 {
        self.initial_investment + self.annual_contribution() * self.forecast_years as f64
    }

    #[must_use]
    pub fn reserved_settings(&self) -> ReservedSettings {
        ReservedSettings {
            rebalance_frequency: self.rebalance_frequency.clone(),
            tax_rate_pct: self.tax_rate_pct,
            confidence_level: self.confidence_level,
        }
    }
}

/// A complete forecast request: what to forecast and how
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub portfolio: PortfolioSpec,
    #[serde(default)]
    pub simulation: SimulationConfig,
}
