//! Tests for the historical metrics calculator
//!
//! These tests verify that:
//! - A two-symbol basket produces the expected returns, index, drawdown and VaR
//! - Short or unpriced histories degrade to zero metrics without panicking
//! - The calculation is pure

use jiff::civil::date;

use crate::metrics::{TRADING_DAYS, compute_metrics, daily_returns};
use crate::model::{PortfolioSpec, PriceRow};

fn two_symbol_rows() -> Vec<PriceRow> {
    vec![
        PriceRow::new(date(2024, 1, 2))
            .with_price("A", 100.0)
            .with_price("B", 50.0),
        PriceRow::new(date(2024, 1, 3))
            .with_price("A", 102.0)
            .with_price("B", 51.0),
        PriceRow::new(date(2024, 1, 4))
            .with_price("A", 101.0)
            .with_price("B", 50.5),
    ]
}

fn wavy_rows(days: i16) -> Vec<PriceRow> {
    let start = date(2020, 1, 1);
    (0..days)
        .map(|d| {
            let t = f64::from(d);
            PriceRow::new(start.checked_add(jiff::Span::new().days(d)).unwrap())
                .with_price("A", 100.0 + 10.0 * (t / 7.0).sin() + t * 0.1)
                .with_price("B", 40.0 + 3.0 * (t / 3.0).cos())
        })
        .collect()
}

#[test]
fn test_two_symbol_basket() {
    let portfolio = PortfolioSpec::equal_weight(["A", "B"]);
    let metrics = compute_metrics(&two_symbol_rows(), &portfolio, 10_000.0);

    let down = -1.0 / 102.0;
    let returns = daily_returns(&two_symbol_rows(), &portfolio);
    assert_eq!(returns.len(), 2);
    assert!((returns[0] - 0.02).abs() < 1e-12);
    assert!((returns[1] - down).abs() < 1e-12);

    assert_eq!(metrics.observations, 2);
    assert_eq!(metrics.synthetic_price_index.len(), 3);
    assert!((metrics.synthetic_price_index[1] - 102.0).abs() < 1e-9);
    assert!((metrics.synthetic_price_index[2] - 101.0).abs() < 1e-9);

    let mean = (0.02 + down) / 2.0;
    assert!((metrics.annual_return - mean * TRADING_DAYS).abs() < 1e-9);
    assert!(metrics.annual_volatility > 0.0);
    assert!(metrics.max_drawdown > 0.0);
    assert!((metrics.max_drawdown - 100.0 / 10_200.0).abs() < 1e-12);
    assert!((metrics.var_95 - down * TRADING_DAYS.sqrt()).abs() < 1e-12);
}

#[test]
fn test_single_day_yields_zero_metrics() {
    let portfolio = PortfolioSpec::equal_weight(["A", "B"]);
    let rows = &two_symbol_rows()[..1];
    let metrics = compute_metrics(rows, &portfolio, 10_000.0);

    assert_eq!(metrics.observations, 0);
    assert_eq!(metrics.annual_return, 0.0);
    assert_eq!(metrics.annual_volatility, 0.0);
    assert_eq!(metrics.sharpe_ratio, 0.0);
    assert_eq!(metrics.max_drawdown, 0.0);
    assert_eq!(metrics.var_95, 0.0);
    assert!(metrics.synthetic_price_index.is_empty());
    assert!(compute_metrics(&[], &portfolio, 10_000.0).ensure_finite().is_ok());
}

#[test]
fn test_unpriced_symbol_yields_zero_metrics() {
    let portfolio = PortfolioSpec::equal_weight(["A", "C"]);
    let metrics = compute_metrics(&two_symbol_rows(), &portfolio, 10_000.0);
    assert_eq!(metrics.observations, 0);
    assert!(metrics.synthetic_price_index.is_empty());
}

#[test]
fn test_metrics_are_finite_and_bounded() {
    let rows = wavy_rows(400);
    let portfolio = PortfolioSpec::default()
        .with_weight("A", 0.7)
        .with_weight("B", 0.3);
    let metrics = compute_metrics(&rows, &portfolio, 10_000.0);

    assert!(metrics.ensure_finite().is_ok());
    assert_eq!(metrics.observations, 399);
    assert_eq!(metrics.synthetic_price_index.len(), 400);
    assert_eq!(metrics.synthetic_price_index[0], 100.0);
    assert!((0.0..=1.0).contains(&metrics.max_drawdown));
    assert!(metrics.var_95 < 0.0);
}

#[test]
fn test_compute_metrics_is_idempotent() {
    let rows = wavy_rows(120);
    let portfolio = PortfolioSpec::equal_weight(["A", "B"]);
    let first = compute_metrics(&rows, &portfolio, 5_000.0);
    let second = compute_metrics(&rows, &portfolio, 5_000.0);
    assert_eq!(first, second);
}
