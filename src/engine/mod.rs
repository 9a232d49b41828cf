//! Core trading engine components.
//!
//! This module provides the fundamental types for backtesting:
//! - `Candle`: OHLCV data for backtesting.
//! - `Order`: Limit entry orders.
//! - `Position`: Open long trades with stop-loss and take-profit.
//! - `Trade`: Closed round trips, the ledger entries.
//! - `Account`: Tracks the balance.
//! - `Backtest`: The step loop tying them together.

mod account;
mod candle;
mod order;
mod position;

use std::collections::{VecDeque, vec_deque::Iter};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, Sizing};
use crate::errors::{Error, Result};
use crate::signals::SignalSet;

pub use account::*;
pub use candle::*;
pub use order::*;
pub use position::*;

#[cfg(test)]
mod tests;

/// Backtesting engine for a signal-vote strategy.
///
/// Each step over the candle sequence runs, in order:
/// 1. fill the pending order if the candle range crosses its limit,
/// 2. place a new buy order at the close when enough signals fire and
///    nothing is open or pending,
/// 3. close positions whose close hits the stop-loss or take-profit.
///
/// Positions still open after the last candle stay open.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: Config,
    signals: SignalSet,
    account: Account,
    data: Arc<[Candle]>,
    orders: VecDeque<Order>,
    positions: VecDeque<Position>,
    closed_orders: Vec<Order>,
    trades: Vec<Trade>,
    next_order_id: u32,
}

impl std::ops::Deref for Backtest {
    type Target = Account;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl Backtest {
    /// Creates a new backtest instance.
    ///
    /// ### Arguments
    /// * `data` - Candles, oldest first.
    /// * `config` - Strategy and risk parameters.
    ///
    /// ### Returns
    /// The new backtest instance, or `Error::InvalidConfiguration` / `Error::CandleDataEmpty`.
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use bts_vote::prelude::*;
    ///
    /// let candle = CandleBuilder::builder()
    ///     .timestamp_millis(1_700_000_000_000)
    ///     .open(100.0)
    ///     .high(110.0)
    ///     .low(95.0)
    ///     .close(105.0)
    ///     .volume(1.0)
    ///     .build()
    ///     .unwrap();
    ///
    /// let config = Config {
    ///     signals: vec![],
    ///     required_signals: 0,
    ///     ..Config::default()
    /// };
    /// let mut bts = Backtest::new(Arc::from_iter(vec![candle]), config).unwrap();
    /// bts.run().unwrap();
    /// assert_eq!(bts.orders().count(), 1);
    /// ```
    pub fn new(data: Arc<[Candle]>, config: Config) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::CandleDataEmpty);
        }
        config.validate()?;

        Ok(Self {
            data,
            signals: SignalSet::from(&config),
            account: Account::new(config.initial_balance)?,
            config,
            orders: VecDeque::new(),
            positions: VecDeque::new(),
            closed_orders: Vec::new(),
            trades: Vec::new(),
            next_order_id: 1,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the active signals.
    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    /// Returns the account.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Returns an iterator over the data.
    pub fn candles(&self) -> std::slice::Iter<'_, Candle> {
        self.data.iter()
    }

    /// Returns an iterator over the pending orders.
    pub fn orders(&self) -> Iter<'_, Order> {
        self.orders.iter()
    }

    /// Returns an iterator over the open positions.
    pub fn positions(&self) -> Iter<'_, Position> {
        self.positions.iter()
    }

    /// Returns filled and cancelled orders, in resolution order.
    pub fn closed_orders(&self) -> std::slice::Iter<'_, Order> {
        self.closed_orders.iter()
    }

    /// Returns the orders voided for lack of balance.
    pub fn voided_orders(&self) -> impl Iterator<Item = &Order> {
        self.closed_orders
            .iter()
            .filter(|order| order.status() == OrderStatus::Cancelled)
    }

    /// Returns the trade ledger, oldest first.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Profit or loss of the open positions marked at the last close.
    pub fn unrealized_pnl(&self) -> f64 {
        let Some(last) = self.data.last() else {
            return 0.0;
        };
        self.positions
            .iter()
            .map(|position| position.estimate_pnl(last.close()))
            .sum()
    }

    /// Balance plus the open positions marked at the last close.
    pub fn equity(&self) -> f64 {
        let committed = self.positions.iter().map(Position::cost).sum::<f64>();
        self.account.balance() + committed + self.unrealized_pnl()
    }

    /// Fills pending orders whose limit the candle range crosses.
    fn execute_orders(&mut self, candle: &Candle) -> Result<()> {
        let mut orders = VecDeque::with_capacity(self.orders.len());
        while let Some(mut order) = self.orders.pop_front() {
            if !order.is_triggered_by(candle) {
                orders.push_back(order);
                continue;
            }

            let position = Position::open(
                &order,
                candle.timestamp(),
                self.config.risk.stop_loss_pct,
                self.config.risk.take_profit_pct,
            )?;
            match self.account.debit(position.cost()) {
                Ok(cost) => {
                    order.fill();
                    debug!(
                        order_id = order.id(),
                        price = position.entry_price(),
                        quantity = position.quantity(),
                        cost,
                        stop_loss = position.stop_loss(),
                        take_profit = position.take_profit(),
                        "order filled"
                    );
                    self.positions.push_back(position);
                }
                Err(Error::InsufficientBalance { required, available }) => {
                    order.cancel();
                    warn!(order_id = order.id(), required, available, "order voided: insufficient balance");
                }
                Err(error) => return Err(error),
            }
            self.closed_orders.push(order);
        }
        self.orders.append(&mut orders);
        Ok(())
    }

    /// Places a buy order at the close when the vote passes.
    fn evaluate_entry(&mut self, history: &[Candle]) -> Result<()> {
        let candle = history.last().ok_or(Error::CandleNotFound)?;

        if !self.positions.is_empty() || !self.orders.is_empty() {
            return Ok(());
        }
        let balance = self.account.balance();
        if balance <= 0.0 {
            debug!(balance, "entry skipped: empty balance");
            return Ok(());
        }

        let votes = self.signals.evaluate(history)?;
        if !votes.passes(self.config.required_signals) {
            return Ok(());
        }

        let price = candle.close();
        if price <= 0.0 {
            debug!(price, "entry skipped: no price");
            return Ok(());
        }

        let base = match self.config.risk.sizing {
            Sizing::Compounding => balance,
            Sizing::Fixed => self.account.initial_balance(),
        };
        let quantity = base * self.config.risk.max_position_size / price;
        if !(quantity > 0.0 && quantity.is_finite()) {
            debug!(price, quantity, "entry skipped: no tradable quantity");
            return Ok(());
        }
        let order = Order::new(self.next_order_id, OrderSide::Buy, price, quantity, candle.timestamp())?;
        self.next_order_id += 1;

        debug!(order_id = order.id(), price, quantity, votes = votes.count(), "order placed");
        self.orders.push_back(order);
        Ok(())
    }

    /// Closes positions whose close reaches the stop-loss or take-profit.
    fn execute_positions(&mut self, candle: &Candle) -> Result<()> {
        let mut positions = VecDeque::with_capacity(self.positions.len());
        while let Some(position) = self.positions.pop_front() {
            match position.exit_reason(candle.close()) {
                Some(reason) => {
                    self.close_position(candle, position, reason)?;
                }
                None => positions.push_back(position),
            }
        }
        self.positions.append(&mut positions);
        Ok(())
    }

    /// Closes a position at the candle close and appends the trade.
    fn close_position(&mut self, candle: &Candle, position: Position, reason: ExitReason) -> Result<f64> {
        let exit_price = candle.close();
        let balance = self.account.credit(position.quantity() * exit_price)?;
        let trade = Trade::close(position, candle.timestamp(), exit_price, balance, reason);

        info!(
            order_id = trade.order_id(),
            entry = trade.entry_price(),
            exit = exit_price,
            profit = trade.profit(),
            balance,
            ?reason,
            "position closed"
        );
        self.trades.push(trade);
        Ok(trade.profit())
    }

    /// Runs one step on `candles[index]`, with `candles[..=index]` as history.
    fn step(&mut self, candles: &[Candle], index: usize) -> Result<()> {
        let candle = candles.get(index).ok_or(Error::CandleNotFound)?;
        self.execute_orders(candle)?;
        self.evaluate_entry(&candles[..=index])?;
        self.execute_positions(candle)?;
        Ok(())
    }

    /// Runs the backtest over every candle.
    ///
    /// State is reset first, so running twice gives the same ledger. The loop
    /// starts at index `lookback - 1`, the first candle covering every signal's
    /// configured window; signals still short of history vote false.
    ///
    /// ### Returns
    /// Ok if successful, or `Error::DataInsufficiency` before any step when
    /// there are fewer candles than the largest configured window.
    pub fn run(&mut self) -> Result<()> {
        self.reset();

        let lookback = self.signals.lookback();
        if self.data.len() < lookback {
            return Err(Error::DataInsufficiency {
                required: lookback,
                available: self.data.len(),
            });
        }

        let candles = Arc::clone(&self.data);
        for index in lookback.saturating_sub(1)..candles.len() {
            self.step(&candles, index)?;
        }

        info!(
            candles = candles.len(),
            trades = self.trades.len(),
            open_positions = self.positions.len(),
            balance = self.account.balance(),
            "backtest finished"
        );
        Ok(())
    }

    /// Resets the backtest to its initial state.
    pub fn reset(&mut self) {
        self.account.reset();
        self.orders = VecDeque::new();
        self.positions = VecDeque::new();
        self.closed_orders = Vec::new();
        self.trades = Vec::new();
        self.next_order_id = 1;
    }
}
