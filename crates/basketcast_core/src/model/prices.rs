//! Daily closing-price history for a universe of instruments

use std::collections::BTreeSet;

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A closing price is usable when it is finite and strictly positive
#[must_use]
#[inline]
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Closing prices for every instrument that traded on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: Date,
    pub prices: FxHashMap<String, f64>,
}

impl PriceRow {
    #[must_use]
    pub fn new(date: Date) -> Self {
        Self {
            date,
            prices: FxHashMap::default(),
        }
    }

    /// Builder-style insert, mostly useful in tests
    #[must_use]
    pub fn with_price(mut self, symbol: impl Into<String>, close: f64) -> Self {
        self.prices.insert(symbol.into(), close);
        self
    }

    /// Closing price for `symbol`, or `None` if absent, zero, negative or not finite
    #[must_use]
    pub fn close(&self, symbol: &str) -> Option<f64> {
        self.prices
            .get(symbol)
            .copied()
            .filter(|p| is_valid_price(*p))
    }
}

/// Date-ordered price history.
///
/// Rows are sorted ascending by date with no duplicate dates. The series is
/// never mutated after construction; shared access goes through `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    rows: Vec<PriceRow>,
    symbols: Vec<String>,
}

impl PriceSeries {
    /// Build a series from rows in any order.
    ///
    /// Rows sharing a date are merged; on conflicting symbols the later row wins.
    #[must_use]
    pub fn from_rows(mut rows: Vec<PriceRow>) -> Self {
        rows.sort_by_key(|r| r.date);

        let mut merged: Vec<PriceRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match merged.last_mut() {
                Some(last) if last.date == row.date => last.prices.extend(row.prices),
                _ => merged.push(row),
            }
        }
        merged.retain(|r| !r.prices.is_empty());

        let symbols: BTreeSet<&String> = merged.iter().flat_map(|r| r.prices.keys()).collect();
        let symbols = symbols.into_iter().cloned().collect();

        Self {
            rows: merged,
            symbols,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All instrument symbols seen anywhere in the series, sorted
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols
            .binary_search_by(|s| s.as_str().cmp(symbol))
            .is_ok()
    }

    #[must_use]
    pub fn first_date(&self) -> Option<Date> {
        self.rows.first().map(|r| r.date)
    }

    #[must_use]
    pub fn last_date(&self) -> Option<Date> {
        self.rows.last().map(|r| r.date)
    }

    /// Rows with `start <= date <= end`; an open bound is unbounded
    #[must_use]
    pub fn range(&self, start: Option<Date>, end: Option<Date>) -> &[PriceRow] {
        let lo = start.map_or(0, |s| self.rows.partition_point(|r| r.date < s));
        let hi = end.map_or(self.rows.len(), |e| {
            self.rows.partition_point(|r| r.date <= e)
        });
        if lo >= hi { &[] } else { &self.rows[lo..hi] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn series() -> PriceSeries {
        PriceSeries::from_rows(vec![
            PriceRow::new(date(2024, 1, 3)).with_price("A", 101.0),
            PriceRow::new(date(2024, 1, 1)).with_price("A", 100.0),
            PriceRow::new(date(2024, 1, 2))
                .with_price("A", 102.0)
                .with_price("B", 51.0),
            PriceRow::new(date(2024, 1, 4)).with_price("A", 99.0),
        ])
    }

    #[test]
    fn test_rows_are_sorted() {
        let s = series();
        let dates: Vec<Date> = s.rows().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 4)
            ]
        );
        assert_eq!(s.symbols(), &["A".to_string(), "B".to_string()]);
        assert!(s.contains_symbol("B"));
        assert!(!s.contains_symbol("C"));
    }

    #[test]
    fn test_duplicate_dates_merge() {
        let s = PriceSeries::from_rows(vec![
            PriceRow::new(date(2024, 1, 1)).with_price("A", 1.0),
            PriceRow::new(date(2024, 1, 1)).with_price("B", 2.0),
            PriceRow::new(date(2024, 1, 1)).with_price("A", 3.0),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.rows()[0].close("A"), Some(3.0));
        assert_eq!(s.rows()[0].close("B"), Some(2.0));
    }

    #[test]
    fn test_range_inclusive() {
        let s = series();
        let slice = s.range(Some(date(2024, 1, 2)), Some(date(2024, 1, 3)));
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].date, date(2024, 1, 2));

        assert_eq!(s.range(None, Some(date(2024, 1, 1))).len(), 1);
        assert_eq!(s.range(Some(date(2024, 1, 4)), None).len(), 1);
        assert_eq!(s.range(None, None).len(), 4);
        assert!(s.range(Some(date(2025, 1, 1)), None).is_empty());
        assert!(
            s.range(Some(date(2024, 1, 3)), Some(date(2024, 1, 2)))
                .is_empty()
        );
    }

    #[test]
    fn test_invalid_close_is_none() {
        let row = PriceRow::new(date(2024, 1, 1))
            .with_price("ZERO", 0.0)
            .with_price("NEG", -1.0)
            .with_price("NAN", f64::NAN)
            .with_price("OK", 5.0);
        assert_eq!(row.close("ZERO"), None);
        assert_eq!(row.close("NEG"), None);
        assert_eq!(row.close("NAN"), None);
        assert_eq!(row.close("MISSING"), None);
        assert_eq!(row.close("OK"), Some(5.0));
    }
}
