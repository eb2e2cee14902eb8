//! Price dataset loading
//!
//! Reads the long CSV layout with one row per symbol per trading day:
//!
//! ```text
//! date,open,high,low,close,volume,Name
//! 2013-02-08,15.07,15.12,14.63,14.75,8407500,AAL
//! ```
//!
//! Columns are located by header name, so extra or reordered columns are fine.
//! Only the date, close and symbol columns are used.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use jiff::civil::Date;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::model::{PriceRow, PriceSeries};

const DATE_COLUMNS: &[&str] = &["date", "timestamp"];
const CLOSE_COLUMNS: &[&str] = &["close", "adj close"];
const SYMBOL_COLUMNS: &[&str] = &["name", "symbol", "ticker"];

struct Columns {
    date: usize,
    close: usize,
    symbol: usize,
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, LoadError> {
        Ok(Self {
            date: find_column(headers, DATE_COLUMNS).ok_or(LoadError::MissingColumn("date"))?,
            close: find_column(headers, CLOSE_COLUMNS).ok_or(LoadError::MissingColumn("close"))?,
            symbol: find_column(headers, SYMBOL_COLUMNS)
                .ok_or(LoadError::MissingColumn("Name"))?,
        })
    }

    fn parse<'r>(&self, record: &'r StringRecord) -> Option<(Date, &'r str, f64)> {
        let date = record.get(self.date)?.trim().parse::<Date>().ok()?;
        let symbol = record.get(self.symbol)?.trim();
        if symbol.is_empty() {
            return None;
        }
        let close = record.get(self.close)?.trim().parse::<f64>().ok()?;
        Some((date, symbol, close))
    }
}

/// Load a price series from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<PriceSeries, LoadError> {
    let path = path.as_ref();
    info!("Loading prices from: {}", path.display());
    let file = std::fs::File::open(path)?;
    load_csv_from_reader(file)
}

/// Load a price series from in-memory CSV text
pub fn load_csv_from_str(content: &str) -> Result<PriceSeries, LoadError> {
    load_csv_from_reader(content.as_bytes())
}

/// Load a price series from any CSV source.
///
/// Malformed records are skipped and counted. When a (date, symbol) pair
/// appears more than once the last record wins.
pub fn load_csv_from_reader<R: Read>(source: R) -> Result<PriceSeries, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut by_date: BTreeMap<Date, FxHashMap<String, f64>> = BTreeMap::new();
    let mut skipped = 0usize;
    let mut records = 0usize;

    for (row_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
        };
        let Some((date, symbol, close)) = columns.parse(&record) else {
            debug!("Skipping malformed row {}", row_num + 1);
            skipped += 1;
            continue;
        };
        by_date
            .entry(date)
            .or_default()
            .insert(symbol.to_owned(), close);
        records += 1;
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows", skipped);
    }

    let rows = by_date
        .into_iter()
        .map(|(date, prices)| PriceRow { date, prices })
        .collect();
    let series = PriceSeries::from_rows(rows);
    if series.is_empty() {
        return Err(LoadError::NoData);
    }

    info!(
        records,
        days = series.len(),
        symbols = series.symbols().len(),
        "Loaded price series"
    );
    Ok(series)
}
