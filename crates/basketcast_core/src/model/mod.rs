mod portfolio;
mod prices;
mod results;

pub use portfolio::PortfolioSpec;
pub use prices::{PriceRow, PriceSeries, is_valid_price};
pub use results::{
    AnnualStatistics, FinalValueSummary, ForecastReport, HistoricalMetrics, ModelUsed,
    PercentilePoint, SimulationResult,
};
