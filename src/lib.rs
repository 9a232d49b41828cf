//! # BTS Vote: signal-vote backtesting on OHLCV candles
//!
//! **BTS Vote** replays a long-only trading strategy over candlestick (OHLCV) data.
//! Five technical signals vote on every candle; when enough of them agree, a limit
//! buy order is placed at the close, filled on a later candle, and bracketed by a
//! stop-loss and a take-profit.
//!
//! ## Core Components
//! | Component     | Description                                                                              |
//! |---------------|------------------------------------------------------------------------------------------|
//! | **`Candle`**  | OHLCV data for a single time period, validated by `CandleBuilder`.                      |
//! | **`Signal`**  | One rule: SMA crossover, RSI oversold, MACD crossover, Bollinger breakout, volume spike. |
//! | **`SignalSet`** | The active rules, evaluated together into `Votes`.                                    |
//! | **`Order`**   | Limit buy order waiting for a candle to cross its price.                                |
//! | **`Position`** | Open long trade with its stop-loss and take-profit.                                    |
//! | **`Trade`**   | Closed round trip, one entry of the append-only ledger.                                 |
//! | **`Account`** | Tracks the balance.                                                                     |
//! | **`Metrics`** | Win rate, max drawdown, total return, profit factor.                                    |
//! | **`Optimizer`** | Runs many configurations in parallel *(feature `optimizer`)*.                        |
//! | **`Backtest`** | The engine stepping through the candles.                                               |
//!
//! ## Step order
//! For every candle, after the signals' warm-up:
//! 1. the pending order fills if `low <= limit`, opening a position,
//! 2. with nothing open or pending, the signals vote on the history up to this candle,
//! 3. positions whose close reaches the stop-loss or the take-profit are closed at the close.
//!
//! ## Getting Started
//! ```rust
//! use std::sync::Arc;
//!
//! use bts_vote::prelude::*;
//!
//! let candles = (0..120)
//!     .map(|i| {
//!         let close = 100.0 + 5.0 * (i as f64 * 0.2).sin();
//!         CandleBuilder::builder()
//!             .timestamp_millis(i * 3_600_000)
//!             .open(close)
//!             .high(close + 1.0)
//!             .low(close - 1.0)
//!             .close(close)
//!             .volume(100.0)
//!             .build()
//!     })
//!     .collect::<Result<Arc<[Candle]>>>()
//!     .unwrap();
//!
//! let config = Config {
//!     signals: vec![SignalKind::Sma, SignalKind::Rsi],
//!     required_signals: 1,
//!     ..Config::default()
//! };
//!
//! let mut backtest = Backtest::new(candles, config).unwrap();
//! backtest.run().unwrap();
//!
//! let metrics = Metrics::from(&backtest);
//! println!("{metrics}");
//! ```
//!
//! ## Features
//! | Feature       | Description                                                                      |
//! |---------------|----------------------------------------------------------------------------------|
//! | `serde`       | Serialize results, load `Config` from TOML and candles from JSON.               |
//! | `optimizer`   | Parallel parameter sweep with [`rayon`](https://crates.io/crates/rayon).        |
//!
//! ## Logging
//! The engine emits [`tracing`](https://crates.io/crates/tracing) events and never installs
//! a subscriber.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Backtest configuration: strategy, risk and signal selection.
pub mod config;

/// Core trading engine components: candles, orders, positions, account, and backtest logic.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Technical signals and the vote.
pub mod signals;

/// Performance metrics: drawdown, win rate, return, profit factor.
pub mod metrics;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Candle loading from JSON files.
#[cfg(feature = "serde")]
pub mod utils;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;
    pub use crate::signals::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;

    #[cfg(feature = "serde")]
    pub use crate::utils::*;
}

use std::ops::{Add, Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
///
/// This trait provides methods to add, subtract, and calculate percentages
/// for numeric types, enabling common financial calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Adds a percentage to the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to add (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value increased by the given percentage.
    fn addpercent(self, rhs: Rhs) -> Self;

    /// Subtracts a percentage from the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to subtract (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value decreased by the given percentage.
    fn subpercent(self, rhs: Rhs) -> Self;

    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Self) -> Self;
}

impl PercentCalculus for f64 {
    fn addpercent(self, percent: Self) -> Self {
        self.add(self.mul(percent.div(100.0)))
    }

    fn subpercent(self, percent: Self) -> Self {
        self.sub(self.mul(percent.div(100.0)))
    }

    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}
