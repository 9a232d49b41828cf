//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate:
//! - Win rate
//! - Max drawdown
//! - Total return
//! - Profit factor
//!
//! Everything is derived from the trade ledger and the initial and current balances.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::PercentCalculus;
use crate::engine::{Backtest, Trade};

/// A collection of trading metrics calculated from the trade ledger.
///
/// ### Example
/// ```rust
/// use std::sync::Arc;
///
/// use bts_vote::prelude::*;
///
/// let candle = CandleBuilder::builder()
///     .timestamp_millis(0)
///     .open(100.0)
///     .high(100.0)
///     .low(100.0)
///     .close(100.0)
///     .volume(1.0)
///     .build()
///     .unwrap();
/// let config = Config {
///     signals: vec![],
///     required_signals: 0,
///     ..Config::default()
/// };
/// let mut bts = Backtest::new(Arc::from_iter(vec![candle]), config).unwrap();
/// bts.run().unwrap();
///
/// let metrics = Metrics::from(&bts);
/// assert_eq!(metrics.total_trades(), 0);
/// assert_eq!(metrics.win_rate(), None);
/// println!("{metrics}");
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    trades: Vec<Trade>,
    initial_balance: f64,
    balance: f64,
}

/// Serializable snapshot of every metric.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of closed trades.
    pub total_trades: usize,
    /// Fraction of trades with a positive profit.
    pub win_rate: Option<f64>,
    /// Largest peak-to-trough decline of the balance, as a fraction.
    pub max_drawdown: f64,
    /// Balance change relative to the initial balance, in percent.
    pub total_return_pct: f64,
    /// Sum of realized profits.
    pub net_profit: f64,
    /// Gross profit over gross loss.
    pub profit_factor: f64,
    /// Balance the run started with.
    pub initial_balance: f64,
    /// Balance at the end of the run.
    pub final_balance: f64,
}

impl From<&Backtest> for Metrics {
    fn from(value: &Backtest) -> Self {
        Self::new(value.trades().to_vec(), value.initial_balance(), value.balance())
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance from a trade ledger, the initial balance and the current balance.
    pub fn new(trades: Vec<Trade>, initial_balance: f64, balance: f64) -> Self {
        Self {
            trades,
            initial_balance,
            balance,
        }
    }

    /// Returns the trades.
    pub fn trades(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    /// Returns the initial balance.
    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Returns the balance.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Number of closed trades.
    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    /// Fraction of trades with a positive profit, `None` without trades.
    pub fn win_rate(&self) -> Option<f64> {
        if self.trades.is_empty() {
            return None;
        }
        let winning_trades = self.trades.iter().filter(|trade| trade.profit() > 0.0).count();
        Some(winning_trades as f64 / self.trades.len() as f64)
    }

    /// Computes the maximum drawdown as a fraction of the running peak.
    ///
    /// The balance series is the initial balance followed by the balance after each trade.
    pub fn max_drawdown(&self) -> f64 {
        let balance_history = std::iter::once(self.initial_balance).chain(self.trades.iter().map(Trade::balance));

        let mut max_peak = f64::MIN;
        let mut max_drawdown = 0.0;

        for balance in balance_history {
            if balance > max_peak {
                max_peak = balance;
            }
            if max_peak <= 0.0 {
                continue;
            }
            let drawdown = (max_peak - balance) / max_peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown
    }

    /// Balance change relative to the initial balance, in percent.
    ///
    /// Only cash counts: the stake of a position still open at the end is missing
    /// from the balance and reads as a loss. Use [`Backtest::equity`] to mark it
    /// at the last close.
    pub fn total_return_pct(&self) -> f64 {
        self.initial_balance.change(self.balance)
    }

    /// Sum of realized profits.
    pub fn net_profit(&self) -> f64 {
        self.trades.iter().map(Trade::profit).sum()
    }

    /// Computes the profit factor, `INFINITY` when no trade lost.
    pub fn profit_factor(&self) -> f64 {
        let mut total_gains = 0.0;
        let mut total_losses = 0.0;

        for trade in &self.trades {
            let profit = trade.profit();
            if profit > 0.0 {
                total_gains += profit;
            } else {
                total_losses += profit.abs();
            }
        }

        if total_losses == 0.0 {
            return f64::INFINITY;
        }

        total_gains / total_losses
    }

    /// Snapshot of every metric.
    pub fn summary(&self) -> Summary {
        Summary {
            total_trades: self.total_trades(),
            win_rate: self.win_rate(),
            max_drawdown: self.max_drawdown(),
            total_return_pct: self.total_return_pct(),
            net_profit: self.net_profit(),
            profit_factor: self.profit_factor(),
            initial_balance: self.initial_balance,
            final_balance: self.balance,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Initial Balance: {:.2}", self.initial_balance)?;
        writeln!(f, "Final Balance: {:.2}", self.balance)?;
        writeln!(f, "Net Profit: {:.2}", self.net_profit())?;
        writeln!(f, "Total Return: {:.2}%", self.total_return_pct())?;
        #[allow(clippy::writeln_empty_string)]
        writeln!(f, "")?;
        writeln!(f, "Total Trades: {}", self.total_trades())?;
        match self.win_rate() {
            Some(rate) => writeln!(f, "Win Rate: {:.2}%", rate * 100.0)?,
            None => writeln!(f, "Win Rate: n/a")?,
        }
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown() * 100.0)?;
        write!(f, "Profit Factor: {:.2}", self.profit_factor())
    }
}
