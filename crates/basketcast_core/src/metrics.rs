//! Historical risk/return statistics of a weighted basket
//!
//! Turns a slice of daily price rows into daily portfolio returns and reduces
//! them to annualized figures. Every reduction tolerates an empty return
//! series and yields zeros rather than NaN.

use crate::model::{HistoricalMetrics, PortfolioSpec, PriceRow};

/// Trading days per year used for annualization
pub const TRADING_DAYS: f64 = 252.0;

/// Starting level of the synthetic price index
pub const INDEX_BASE: f64 = 100.0;

/// Tail probability for the historical Value-at-Risk
pub const VAR_TAIL: f64 = 0.05;

/// Weighted return between two consecutive rows.
///
/// `None` when any selected symbol lacks a valid close on either day; such a
/// pair is dropped from the return series rather than treated as zero.
fn pair_return(prev: &PriceRow, curr: &PriceRow, portfolio: &PortfolioSpec) -> Option<f64> {
    let mut total = 0.0;
    for symbol in &portfolio.symbols {
        let before = prev.close(symbol)?;
        let after = curr.close(symbol)?;
        total += portfolio.weight(symbol) * (after - before) / before;
    }
    Some(total)
}

/// Daily portfolio returns over every fully priced consecutive pair of rows
#[must_use]
pub fn daily_returns(rows: &[PriceRow], portfolio: &PortfolioSpec) -> Vec<f64> {
    rows.windows(2)
        .filter_map(|pair| pair_return(&pair[0], &pair[1], portfolio))
        .collect()
}

/// Base-100 index compounded through `returns`.
///
/// Holds `returns.len() + 1` points, or none at all for an empty series.
#[must_use]
pub fn synthetic_index(returns: &[f64]) -> Vec<f64> {
    if returns.is_empty() {
        return Vec::new();
    }
    let mut index = Vec::with_capacity(returns.len() + 1);
    let mut level = INDEX_BASE;
    index.push(level);
    for r in returns {
        level *= 1.0 + r;
        index.push(level);
    }
    index
}

/// Mean and population standard deviation; `(0, 0)` when empty
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Largest peak-to-trough decline of `initial` compounded through `returns`
#[must_use]
pub fn max_drawdown(returns: &[f64], initial: f64) -> f64 {
    let mut value = initial;
    let mut peak = initial;
    let mut max_drawdown: f64 = 0.0;

    for r in returns {
        value *= 1.0 + r;
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - value) / peak);
        }
    }

    max_drawdown.clamp(0.0, 1.0)
}

/// Nearest-rank percentile of an ascending-sorted slice.
///
/// Index `floor(n * p)`, clamped to the last element; 0 for an empty slice.
#[must_use]
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() as f64 * p).floor().max(0.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Annualized historical VaR at the 95% level
#[must_use]
pub fn value_at_risk(returns: &[f64]) -> f64 {
    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);
    nearest_rank(&sorted, VAR_TAIL) * TRADING_DAYS.sqrt()
}

/// Historical statistics of `portfolio` over `rows`.
///
/// Pure: identical inputs always give identical outputs.
#[must_use]
pub fn compute_metrics(
    rows: &[PriceRow],
    portfolio: &PortfolioSpec,
    initial_investment: f64,
) -> HistoricalMetrics {
    let returns = daily_returns(rows, portfolio);
    if returns.is_empty() {
        tracing::debug!(rows = rows.len(), "no complete day pairs, metrics default to zero");
        return HistoricalMetrics::default();
    }

    let (mean, std_dev) = mean_std(&returns);
    let annual_return = mean * TRADING_DAYS;
    let annual_volatility = std_dev * TRADING_DAYS.sqrt();
    let sharpe_ratio = if annual_volatility == 0.0 {
        0.0
    } else {
        annual_return / annual_volatility
    };

    HistoricalMetrics {
        annual_return,
        annual_volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(&returns, initial_investment),
        var_95: value_at_risk(&returns),
        observations: returns.len(),
        synthetic_price_index: synthetic_index(&returns),
    }
}
