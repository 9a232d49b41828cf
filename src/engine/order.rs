use chrono::{DateTime, Utc};

use crate::engine::Candle;
use crate::errors::{Error, Result};

/// Represents the side of an order (buy or sell).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    /// Fills when the candle trades at or below the limit.
    Buy,
    /// Fills when the candle trades at or above the limit.
    Sell,
}

/// Lifecycle state of an order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Waiting for a candle to cross the limit.
    Pending,
    /// Converted into a position.
    Filled,
    /// Voided without opening a position.
    Cancelled,
}

/// Limit order waiting to enter a position.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    id: u32,
    side: OrderSide,
    limit_price: f64,
    quantity: f64,
    created_at: DateTime<Utc>,
    status: OrderStatus,
}

impl Order {
    /// Creates a pending order.
    ///
    /// ### Arguments
    /// * `id` - Sequential identifier assigned by the engine.
    /// * `side` - Buy or sell.
    /// * `limit_price` - Price at which the order fills.
    /// * `quantity` - Base-asset quantity.
    /// * `created_at` - Timestamp of the candle that produced the order.
    ///
    /// ### Returns
    /// The order, or an error if the price or quantity is not positive and finite.
    pub fn new(id: u32, side: OrderSide, limit_price: f64, quantity: f64, created_at: DateTime<Utc>) -> Result<Self> {
        if limit_price <= 0.0 || !limit_price.is_finite() {
            return Err(Error::InvalidAmount(limit_price));
        }
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(Error::InvalidAmount(quantity));
        }

        Ok(Self {
            id,
            side,
            limit_price,
            quantity,
            created_at,
            status: OrderStatus::Pending,
        })
    }

    /// Returns the order identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the side of the order.
    pub fn side(&self) -> OrderSide {
        self.side
    }

    /// Returns the limit price.
    pub fn limit_price(&self) -> f64 {
        self.limit_price
    }

    /// Returns the base-asset quantity.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the timestamp of the candle that produced the order.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the lifecycle state.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the total cost of the order (price * quantity).
    pub fn cost(&self) -> f64 {
        self.limit_price * self.quantity
    }

    /// Whether the candle range crosses the limit price.
    pub fn is_triggered_by(&self, candle: &Candle) -> bool {
        match self.side {
            OrderSide::Buy => candle.low() <= self.limit_price,
            OrderSide::Sell => candle.high() >= self.limit_price,
        }
    }

    pub(crate) fn fill(&mut self) {
        self.status = OrderStatus::Filled;
    }

    pub(crate) fn cancel(&mut self) {
        self.status = OrderStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CandleBuilder;

    fn candle(low: f64, high: f64) -> Candle {
        CandleBuilder::builder()
            .timestamp_millis(0)
            .open(low)
            .high(high)
            .low(low)
            .close(high)
            .volume(1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn create_simple_order() {
        let order = Order::new(1, OrderSide::Buy, 100.0, 2.0, DateTime::default()).unwrap();

        assert_eq!(order.limit_price(), 100.0);
        assert_eq!(order.quantity(), 2.0);
        assert_eq!(order.cost(), 200.0);
        assert_eq!(order.side(), OrderSide::Buy);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn reject_invalid_amounts() {
        assert!(matches!(
            Order::new(1, OrderSide::Buy, 0.0, 1.0, DateTime::default()),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            Order::new(1, OrderSide::Buy, 10.0, f64::NAN, DateTime::default()),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn buy_triggers_on_low() {
        let order = Order::new(1, OrderSide::Buy, 100.0, 1.0, DateTime::default()).unwrap();
        assert!(order.is_triggered_by(&candle(99.0, 105.0)));
        assert!(order.is_triggered_by(&candle(100.0, 105.0)));
        assert!(!order.is_triggered_by(&candle(100.5, 105.0)));
    }

    #[test]
    fn sell_triggers_on_high() {
        let order = Order::new(1, OrderSide::Sell, 100.0, 1.0, DateTime::default()).unwrap();
        assert!(order.is_triggered_by(&candle(90.0, 100.0)));
        assert!(!order.is_triggered_by(&candle(90.0, 99.9)));
    }

    #[test]
    fn status_transitions() {
        let mut order = Order::new(1, OrderSide::Buy, 100.0, 1.0, DateTime::default()).unwrap();
        order.fill();
        assert_eq!(order.status(), OrderStatus::Filled);

        let mut order = Order::new(2, OrderSide::Buy, 100.0, 1.0, DateTime::default()).unwrap();
        order.cancel();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }
}
