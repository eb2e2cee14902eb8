use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The basket being forecast: selected instruments and their weights.
///
/// Weights are taken as given; they need not sum to one. A selected symbol
/// with no weight entry contributes nothing to the daily return but still
/// has to be priced on both days of a pair for that pair to count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSpec {
    pub symbols: BTreeSet<String>,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl PortfolioSpec {
    /// Equal-weight basket over `symbols`
    #[must_use]
    pub fn equal_weight<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: BTreeSet<String> = symbols.into_iter().map(Into::into).collect();
        let weight = if symbols.is_empty() {
            0.0
        } else {
            1.0 / symbols.len() as f64
        };
        let weights = symbols.iter().map(|s| (s.clone(), weight)).collect();
        Self { symbols, weights }
    }

    #[must_use]
    pub fn with_weight(mut self, symbol: impl Into<String>, weight: f64) -> Self {
        let symbol = symbol.into();
        self.symbols.insert(symbol.clone());
        self.weights.insert(symbol, weight);
        self
    }

    #[must_use]
    pub fn weight(&self, symbol: &str) -> f64 {
        self.weights.get(symbol).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }
}
