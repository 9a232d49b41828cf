//! Backtest configuration.
//!
//! Strategy and risk parameters are one explicit value handed to
//! [`Backtest::new`](crate::engine::Backtest::new), so runs with different
//! parameters can live side by side. Defaults mirror a 4h crypto setup:
//! SMA 50, RSI 14 (30/70), MACD 12/26/9, Bollinger 20/2, volume spike x2.5,
//! 10% of the balance per trade with a 2% stop and a 4% target.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::signals::{OscillatorTrigger, SignalKind};

/// Indicator parameters for the signal set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Simple moving average window of the trend crossover.
    pub sma_window: usize,
    /// RSI period.
    pub rsi_period: usize,
    /// RSI level below which the market is oversold.
    pub rsi_oversold: f64,
    /// RSI level above which the market is overbought.
    pub rsi_overbought: f64,
    /// Whether the RSI fires on the crossing edge or on the level.
    pub rsi_trigger: OscillatorTrigger,
    /// MACD fast EMA period.
    pub macd_fast: usize,
    /// MACD slow EMA period.
    pub macd_slow: usize,
    /// MACD signal line period.
    pub macd_signal: usize,
    /// Bollinger bands period.
    pub bollinger_period: usize,
    /// Bollinger bands width in standard deviations.
    pub bollinger_std_dev: f64,
    /// Volume must exceed the mean of prior volumes times this factor.
    pub volume_multiplier: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            sma_window: 50,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_trigger: OscillatorTrigger::Edge,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            volume_multiplier: 2.5,
        }
    }
}

/// How the stake of a new order is derived.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sizing {
    /// Fraction of the current balance.
    #[default]
    Compounding,
    /// Fraction of the initial balance.
    Fixed,
}

/// Risk parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    /// Fraction of the balance committed per trade, in `(0, 1]`.
    pub max_position_size: f64,
    /// Stop-loss distance below the entry, in percent.
    pub stop_loss_pct: f64,
    /// Take-profit distance above the entry, in percent.
    pub take_profit_pct: f64,
    /// Base of the stake.
    pub sizing: Sizing,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            max_position_size: 0.1,
            stop_loss_pct: 2.0,
            take_profit_pct: 4.0,
            sizing: Sizing::Compounding,
        }
    }
}

/// Full configuration of a backtest run.
///
/// ### Example
/// ```rust
/// use bts_vote::prelude::*;
///
/// let config = Config {
///     signals: vec![SignalKind::Rsi, SignalKind::Macd],
///     required_signals: 1,
///     ..Config::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Indicator parameters.
    pub strategy: StrategyParams,
    /// Risk parameters.
    pub risk: RiskParams,
    /// Active signals.
    pub signals: Vec<SignalKind>,
    /// Minimum number of simultaneously true signals to enter.
    pub required_signals: usize,
    /// Starting balance.
    pub initial_balance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyParams::default(),
            risk: RiskParams::default(),
            signals: SignalKind::ALL.to_vec(),
            required_signals: 2,
            initial_balance: 10_000.0,
        }
    }
}

fn invalid<T>(reason: impl Into<String>) -> Result<T> {
    Err(Error::InvalidConfiguration(reason.into()))
}

impl Config {
    /// Checks the parameter combination.
    ///
    /// Only the parameters of active signals are checked.
    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;
        let r = &self.risk;

        if !(self.initial_balance > 0.0 && self.initial_balance.is_finite()) {
            return invalid(format!("initial_balance must be positive (got: {})", self.initial_balance));
        }
        if !(r.max_position_size > 0.0 && r.max_position_size <= 1.0) {
            return invalid(format!("max_position_size must be in (0, 1] (got: {})", r.max_position_size));
        }
        if !(r.stop_loss_pct > 0.0 && r.stop_loss_pct < 100.0) {
            return invalid(format!("stop_loss_pct must be in (0, 100) (got: {})", r.stop_loss_pct));
        }
        if !(r.take_profit_pct > 0.0 && r.take_profit_pct.is_finite()) {
            return invalid(format!("take_profit_pct must be positive (got: {})", r.take_profit_pct));
        }
        if r.stop_loss_pct >= r.take_profit_pct {
            return invalid(format!(
                "stop_loss_pct ({}) must be below take_profit_pct ({})",
                r.stop_loss_pct, r.take_profit_pct
            ));
        }

        let mut seen = Vec::with_capacity(self.signals.len());
        for kind in &self.signals {
            if seen.contains(kind) {
                return invalid(format!("signal {} is listed twice", kind.name()));
            }
            seen.push(*kind);

            match kind {
                SignalKind::Sma if s.sma_window == 0 => return invalid("sma_window must be positive"),
                SignalKind::Rsi => {
                    if s.rsi_period == 0 {
                        return invalid("rsi_period must be positive");
                    }
                    if !(0.0..=100.0).contains(&s.rsi_oversold) || !(0.0..=100.0).contains(&s.rsi_overbought) {
                        return invalid("rsi thresholds must be within 0..=100");
                    }
                    if s.rsi_oversold >= s.rsi_overbought {
                        return invalid(format!(
                            "rsi_oversold ({}) must be below rsi_overbought ({})",
                            s.rsi_oversold, s.rsi_overbought
                        ));
                    }
                }
                SignalKind::Macd => {
                    if s.macd_fast == 0 || s.macd_slow == 0 || s.macd_signal == 0 {
                        return invalid("macd periods must be positive");
                    }
                    if s.macd_fast >= s.macd_slow {
                        return invalid(format!(
                            "macd_fast ({}) must be below macd_slow ({})",
                            s.macd_fast, s.macd_slow
                        ));
                    }
                }
                SignalKind::Bollinger => {
                    if s.bollinger_period == 0 {
                        return invalid("bollinger_period must be positive");
                    }
                    if !(s.bollinger_std_dev > 0.0 && s.bollinger_std_dev.is_finite()) {
                        return invalid(format!("bollinger_std_dev must be positive (got: {})", s.bollinger_std_dev));
                    }
                }
                SignalKind::Volume if !(s.volume_multiplier > 0.0 && s.volume_multiplier.is_finite()) => {
                    return invalid(format!("volume_multiplier must be positive (got: {})", s.volume_multiplier));
                }
                _ => {}
            }
        }

        if self.required_signals > self.signals.len() {
            return invalid(format!(
                "required_signals ({}) exceeds the {} active signals",
                self.required_signals,
                self.signals.len()
            ));
        }

        Ok(())
    }

    /// Parses a TOML document; missing keys take their default.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    #[cfg(feature = "serde")]
    pub fn from_toml_file(filepath: impl AsRef<std::path::Path>) -> Result<Self> {
        let document = std::fs::read_to_string(filepath)?;
        Self::from_toml_str(&document)
    }
}
