use chrono::{DateTime, Utc};

use crate::PercentCalculus;
use crate::engine::Order;
use crate::errors::{Error, Result};

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The close fell to or below the stop-loss.
    StopLoss,
    /// The close rose to or above the take-profit.
    TakeProfit,
}

/// Open long position created from a filled order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    order_id: u32,
    entry_time: DateTime<Utc>,
    entry_price: f64,
    quantity: f64,
    stop_loss: f64,
    take_profit: f64,
}

impl Position {
    /// Opens a position from a filled order.
    ///
    /// ### Arguments
    /// * `order` - The filled order; its limit price becomes the entry price.
    /// * `entry_time` - Timestamp of the candle that filled the order.
    /// * `stop_loss_pct` - Stop distance below the entry, in percent (2.0 for 2%).
    /// * `take_profit_pct` - Target distance above the entry, in percent.
    ///
    /// ### Returns
    /// The position, or `Error::PositionBounds` if `stop_loss < entry < take_profit` does not hold.
    pub fn open(order: &Order, entry_time: DateTime<Utc>, stop_loss_pct: f64, take_profit_pct: f64) -> Result<Self> {
        let entry_price = order.limit_price();
        let stop_loss = entry_price.subpercent(stop_loss_pct);
        let take_profit = entry_price.addpercent(take_profit_pct);

        if !(stop_loss < entry_price && entry_price < take_profit) {
            return Err(Error::PositionBounds {
                stop_loss,
                entry: entry_price,
                take_profit,
            });
        }

        Ok(Self {
            order_id: order.id(),
            entry_time,
            entry_price,
            quantity: order.quantity(),
            stop_loss,
            take_profit,
        })
    }

    /// Returns the id of the order that opened the position.
    pub fn order_id(&self) -> u32 {
        self.order_id
    }

    /// Returns the fill time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the base-asset quantity.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the stop-loss price.
    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    /// Returns the take-profit price.
    pub fn take_profit(&self) -> f64 {
        self.take_profit
    }

    /// Capital committed to the position (entry price * quantity).
    pub fn cost(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Profit or loss if the position were closed at `price`.
    pub fn estimate_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity
    }

    /// Checks the exit rule against a close price.
    pub fn exit_reason(&self, close: f64) -> Option<ExitReason> {
        if close <= self.stop_loss {
            Some(ExitReason::StopLoss)
        } else if close >= self.take_profit {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}

/// Closed round trip. Immutable once appended to the ledger.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    order_id: u32,
    entry_time: DateTime<Utc>,
    entry_price: f64,
    exit_time: DateTime<Utc>,
    exit_price: f64,
    quantity: f64,
    stop_loss: f64,
    take_profit: f64,
    profit: f64,
    balance: f64,
    reason: ExitReason,
}

impl Trade {
    pub(crate) fn close(
        position: Position,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        balance: f64,
        reason: ExitReason,
    ) -> Self {
        Self {
            order_id: position.order_id,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time,
            exit_price,
            quantity: position.quantity,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            profit: position.estimate_pnl(exit_price),
            balance,
            reason,
        }
    }

    /// Returns the id of the order that opened the trade.
    pub fn order_id(&self) -> u32 {
        self.order_id
    }

    /// Returns the fill time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the time of the candle that closed the trade.
    pub fn exit_time(&self) -> DateTime<Utc> {
        self.exit_time
    }

    /// Returns the exit price.
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Returns the base-asset quantity.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the stop-loss the position carried.
    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    /// Returns the take-profit the position carried.
    pub fn take_profit(&self) -> f64 {
        self.take_profit
    }

    /// Returns the realized profit (negative for a loss).
    pub fn profit(&self) -> f64 {
        self.profit
    }

    /// Returns the account balance right after the close.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Returns why the trade was closed.
    pub fn reason(&self) -> ExitReason {
        self.reason
    }
}
