//! Reduction of raw trials into percentile summaries
//!
//! Percentiles use the nearest-rank rule (`floor(n * p)` into the sorted
//! sample, clamped) so they are always actual simulated values.

use crate::config::SimulationConfig;
use crate::metrics::nearest_rank;
use crate::model::{FinalValueSummary, ModelUsed, PercentilePoint, SimulationResult};
use crate::simulation::TrialSet;

/// Standard percentiles reported by the aggregator
pub mod standard {
    pub const P10: f64 = 0.10;
    pub const P50: f64 = 0.50;
    pub const P90: f64 = 0.90;
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

fn percentile_point(year: usize, values: Vec<f64>) -> PercentilePoint {
    let values = sorted(values);
    PercentilePoint {
        year,
        median: nearest_rank(&values, standard::P50),
        p10: nearest_rank(&values, standard::P10),
        p90: nearest_rank(&values, standard::P90),
    }
}

/// Summary of the final-value distribution.
///
/// A trial counts as a success when it ends at or above
/// `initial_investment * success_multiple`.
#[must_use]
pub fn summarize_final_values(
    final_values: &[f64],
    initial_investment: f64,
    success_multiple: f64,
) -> FinalValueSummary {
    let trials = final_values.len();
    if trials == 0 {
        return FinalValueSummary {
            success_multiple,
            ..Default::default()
        };
    }

    let values = sorted(final_values.to_vec());
    let threshold = initial_investment * success_multiple;
    let successes = values.iter().filter(|v| **v >= threshold).count();

    FinalValueSummary {
        trials,
        median: nearest_rank(&values, standard::P50),
        p10: nearest_rank(&values, standard::P10),
        p90: nearest_rank(&values, standard::P90),
        mean: values.iter().sum::<f64>() / trials as f64,
        success_rate: successes as f64 / trials as f64,
        success_multiple,
    }
}

/// Median/p10/p90 of the recorded values for year 0 through the horizon.
///
/// Year 0 is the initial investment in every trial. Empty when the trial
/// set carries no per-year paths.
#[must_use]
pub fn yearly_percentile_path(trials: &TrialSet, initial_investment: f64) -> Vec<PercentilePoint> {
    let Some(paths) = trials.paths.as_ref() else {
        return Vec::new();
    };
    let years = paths.iter().map(Vec::len).min().unwrap_or(0);

    let mut path = Vec::with_capacity(years + 1);
    path.push(PercentilePoint {
        year: 0,
        median: initial_investment,
        p10: initial_investment,
        p90: initial_investment,
    });
    for year in 1..=years {
        let values: Vec<f64> = paths.iter().map(|p| p[year - 1]).collect();
        path.push(percentile_point(year, values));
    }
    path
}

/// Reduce a finished trial set to the forecast result
#[must_use]
pub fn aggregate(
    trials: &TrialSet,
    config: &SimulationConfig,
    model_used: ModelUsed,
    model_label: Option<String>,
) -> SimulationResult {
    SimulationResult {
        yearly_percentile_path: yearly_percentile_path(trials, config.initial_investment),
        final_values: summarize_final_values(
            &trials.final_values,
            config.initial_investment,
            config.success_multiple,
        ),
        model_used,
        model_label,
        total_contributed: config.total_contributed(),
    }
}
