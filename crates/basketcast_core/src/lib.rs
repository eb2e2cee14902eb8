//! Portfolio statistics and Monte Carlo forecasting library
//!
//! This crate turns a daily price history and a weighted basket into a
//! distribution of future portfolio values. It supports:
//! - Historical return, volatility, Sharpe, max drawdown and VaR figures
//! - Optional refinement of the annual statistics by an external ARIMA/GARCH process
//! - Parallel Monte Carlo projection with contributions, inflation and expense drag
//! - Percentile paths and success probability of the simulated outcomes
//!
//! # Example
//!
//! ```ignore
//! use basketcast_core::{ForecastRequest, NoBridge, PortfolioSpec, loader, run_forecast};
//!
//! let series = loader::load_csv("all_stocks_5yr.csv")?;
//! let request = ForecastRequest {
//!     portfolio: PortfolioSpec::equal_weight(["AAPL", "MSFT"]),
//!     simulation: Default::default(),
//! };
//! let report = run_forecast(&series, &request, &NoBridge, None)?;
//! println!("median: {}", report.simulation.final_values.median);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod bridge;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod simulation;
pub mod validation;

// ============================================================================
// Data access
// ============================================================================

pub mod cache;
pub mod loader;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use bridge::{ForecastBridge, NoBridge, ProcessBridge, Refinement};
pub use cache::PriceCache;
pub use config::{ForecastRequest, SimulationConfig};
pub use error::{BridgeError, EngineError, LoadError, ValidationError};
pub use forecast::{historical_metrics, run_forecast};
pub use model::{ForecastReport, HistoricalMetrics, PortfolioSpec, PriceSeries, SimulationResult};
pub use simulation::SimulationControl;
