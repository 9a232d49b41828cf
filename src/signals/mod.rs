//! Signal rules and the vote that turns them into an entry decision.
//!
//! - `Signal`: one rule (trend crossover, oscillator, MACD crossover, band breakout, volume spike).
//! - `SignalSet`: the active rules, evaluated together into `Votes`.

mod signal;

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::Candle;
use crate::errors::Result;

pub use signal::*;

/// Identifies a signal in the configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalKind {
    /// Close/SMA crossover.
    Sma,
    /// RSI oversold.
    Rsi,
    /// MACD/signal crossover.
    Macd,
    /// Bollinger bands breakout.
    Bollinger,
    /// Volume spike.
    Volume,
}

impl SignalKind {
    /// Every signal, in evaluation order.
    pub const ALL: [SignalKind; 5] = [Self::Sma, Self::Rsi, Self::Macd, Self::Bollinger, Self::Volume];

    /// Configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Bollinger => "bollinger",
            Self::Volume => "volume",
        }
    }
}

/// When the oscillator fires.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorTrigger {
    /// The value crossed below the oversold level on this step.
    #[default]
    Edge,
    /// The value is below the oversold level.
    Level,
}

/// Outcome of one evaluation of the signal set: signal name to trigger.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Votes(BTreeMap<&'static str, bool>);

impl Votes {
    /// Number of signals that fired.
    pub fn count(&self) -> usize {
        self.0.values().filter(|fired| **fired).count()
    }

    /// Whether at least `required` signals fired.
    pub fn passes(&self, required: usize) -> bool {
        self.count() >= required
    }

    /// Trigger of the named signal, if it is active.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Iterates over `(name, fired)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.0.iter().map(|(name, fired)| (*name, *fired))
    }
}

/// The active signals.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSet {
    signals: Vec<Signal>,
}

impl From<&Config> for SignalSet {
    fn from(config: &Config) -> Self {
        let signals = config
            .signals
            .iter()
            .map(|kind| Signal::from_params(*kind, &config.strategy))
            .collect();
        Self { signals }
    }
}

impl SignalSet {
    /// Creates a set from explicit signals.
    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }

    /// Returns an iterator over the signals.
    pub fn signals(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    /// Largest configured window among the signals, 0 for an empty set.
    pub fn lookback(&self) -> usize {
        self.signals.iter().map(Signal::lookback).max().unwrap_or(0)
    }

    /// Evaluates every signal over `history` (oldest first, current candle last).
    pub fn evaluate(&self, history: &[Candle]) -> Result<Votes> {
        let mut votes = BTreeMap::new();
        for signal in &self.signals {
            votes.insert(signal.name(), signal.evaluate(history)?);
        }
        Ok(Votes(votes))
    }
}
