//! Strategy parameter optimization.
//!
//! This module sweeps parameter combinations by running one backtest per combination.
//! The `Optimizer` struct handles the execution across threads, while the
//! `ParameterCombination` trait defines how to generate parameter sets.

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::config::Config;
use crate::engine::{Backtest, Candle};
use crate::errors::Result;
use crate::metrics::{Metrics, Summary};

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(usize, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    ///
    /// ### Returns
    /// A vector containing all parameter combinations.
    fn generate() -> Vec<Self::Output>;
}

/// Optimizer for testing the signal-vote strategy with different parameter combinations.
///
/// Every combination gets its own `Backtest`; the candles are shared.
pub struct Optimizer<PC: ParameterCombination> {
    data: Arc<[Candle]>,
    base: Config,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> From<&Backtest> for Optimizer<PC> {
    fn from(value: &Backtest) -> Self {
        Self {
            data: value.candles().copied().collect(),
            base: value.config().clone(),
            _marker: PhantomData,
        }
    }
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates a new `Optimizer`.
    ///
    /// ### Arguments
    /// * `data` - Historical candle data for backtesting.
    /// * `base` - Configuration each combination starts from.
    pub fn new(data: Arc<[Candle]>, base: Config) -> Self {
        Self {
            data,
            base,
            _marker: PhantomData,
        }
    }

    /// Returns the base configuration.
    pub fn base(&self) -> &Config {
        &self.base
    }

    /// Runs a backtest for every parameter combination.
    ///
    /// ### Arguments
    /// * `combinator` - Builds the configuration of a combination from the base configuration.
    ///
    /// ### Returns
    /// Each parameter combination with the summary of its run, in generation order.
    ///
    /// ### Errors
    /// Returns the first error raised by the combinator, the configuration check or a run.
    pub fn with<C>(&self, combinator: C) -> Result<Vec<(PC::Output, Summary)>>
    where
        C: Fn(&PC::Output, &Config) -> Result<Config> + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);
        debug!(combinations = combinations.len(), chunk_size, "optimizer started");

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for param_set in par_combinations {
                    let config = combinator(param_set, &self.base)?;
                    let mut backtest = Backtest::new(Arc::clone(&self.data), config)?;
                    backtest.run()?;
                    local_results.push((param_set.clone(), Metrics::from(&backtest).summary()));
                }

                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}
