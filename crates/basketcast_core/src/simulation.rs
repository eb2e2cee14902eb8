//! Monte Carlo projection of portfolio value
//!
//! Each trial compounds the initial investment year by year under a drawn
//! annual return, subtracts inflation and expenses, and adds the year's
//! contribution. Trials share nothing mutable: every trial seeds its own
//! generator from the base seed and its index, so results are identical
//! whether trials run sequentially or on the rayon pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::{NormalSampler, PathTracking, SimulationConfig};
use crate::error::EngineError;
use crate::model::AnnualStatistics;

/// Odd constant used to spread trial indices across the seed space
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Progress tracking and cooperative cancellation for a Monte Carlo run
#[derive(Debug, Clone, Default)]
pub struct SimulationControl {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl SimulationControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trials finished so far
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Ask the run to stop; checked before each trial starts
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn record_trial(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Raw trial output handed to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSet {
    /// Final value of every trial, in trial order
    pub final_values: Vec<f64>,
    /// `paths[trial][year - 1]`, present only with [`PathTracking::Full`]
    pub paths: Option<Vec<Vec<f64>>>,
    /// Base seed the trial generators were derived from
    pub seed: u64,
}

impl TrialSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.final_values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.final_values.is_empty()
    }

    /// Values of every trial at `year` (1-based), if paths were tracked
    #[must_use]
    pub fn values_at_year(&self, year: usize) -> Option<Vec<f64>> {
        let paths = self.paths.as_ref()?;
        if year == 0 {
            return None;
        }
        paths.iter().map(|p| p.get(year - 1).copied()).collect()
    }
}

/// Seed of the generator for trial `index`
#[must_use]
#[inline]
pub fn trial_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64).wrapping_mul(SEED_STRIDE)
}

/// Draw one deviate with mean 0 and variance 1
pub fn standard_normal<R: Rng + ?Sized>(sampler: NormalSampler, rng: &mut R) -> f64 {
    match sampler {
        NormalSampler::IrwinHall { terms } => {
            let k = terms.max(1);
            let sum: f64 = (0..k).map(|_| rng.random::<f64>()).sum();
            // Var(sum of k uniforms) = k / 12
            (sum - f64::from(k) / 2.0) / (f64::from(k) / 12.0).sqrt()
        }
        NormalSampler::Gaussian => rng.sample::<f64, _>(StandardNormal),
    }
}

/// One simulated future: final value and, if requested, the value after each year
fn run_trial(
    index: usize,
    base_seed: u64,
    stats: AnnualStatistics,
    config: &SimulationConfig,
) -> (f64, Vec<f64>) {
    let mut rng = SmallRng::seed_from_u64(trial_seed(base_seed, index));
    let drag = config.annual_drag();
    let contribution = config.annual_contribution();
    let track = config.path_tracking == PathTracking::Full;

    let mut value = config.initial_investment;
    let mut path = Vec::with_capacity(if track { config.forecast_years } else { 0 });

    for _ in 0..config.forecast_years {
        let z = standard_normal(config.sampler, &mut rng);
        let year_return = stats.mean_return + stats.volatility * z;
        let real_return = year_return - drag;

        value *= 1.0 + real_return;
        // Contributions arrive through the year and earn roughly half the return
        value += contribution * (1.0 + real_return / 2.0);

        if track {
            path.push(value);
        }
    }

    (value, path)
}

/// Run `config.simulation_count` independent trials.
///
/// Returns [`EngineError::Cancelled`] if `control` is cancelled before every
/// trial has started.
pub fn simulate(
    stats: AnnualStatistics,
    config: &SimulationConfig,
    control: Option<&SimulationControl>,
) -> Result<TrialSet, EngineError> {
    let base_seed = config.seed.unwrap_or_else(rand::random);
    tracing::debug!(
        trials = config.simulation_count,
        years = config.forecast_years,
        seed = base_seed,
        mean = stats.mean_return,
        volatility = stats.volatility,
        "starting monte carlo run"
    );

    let trial = |i: usize| -> Option<(f64, Vec<f64>)> {
        if control.is_some_and(SimulationControl::is_cancelled) {
            return None;
        }
        let outcome = run_trial(i, base_seed, stats, config);
        if let Some(c) = control {
            c.record_trial();
        }
        Some(outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Option<Vec<(f64, Vec<f64>)>> = (0..config.simulation_count)
        .into_par_iter()
        .map(trial)
        .collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Option<Vec<(f64, Vec<f64>)>> =
        (0..config.simulation_count).map(trial).collect();

    let outcomes = outcomes.ok_or(EngineError::Cancelled)?;

    let (final_values, paths): (Vec<f64>, Vec<Vec<f64>>) = outcomes.into_iter().unzip();
    let paths = match config.path_tracking {
        PathTracking::Full => Some(paths),
        PathTracking::FinalOnly => None,
    };

    Ok(TrialSet {
        final_values,
        paths,
        seed: base_seed,
    })
}
