#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

// Relative slack accepted on a debit, absorbs the rounding of `balance * 1.0 / price * price`.
const DEBIT_TOLERANCE: f64 = 1e-9;

/// Cash account of a backtest run.
///
/// The balance only moves through [`Account::debit`] (order fill) and
/// [`Account::credit`] (position close) and never goes negative.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    // Initial balance used for reset
    initial_balance: f64,
    // Available balance
    balance: f64,
}

impl Account {
    /// Creates a new account with the given initial balance.
    /// Non-positive balances are rejected.
    pub fn new(balance: f64) -> Result<Self> {
        if balance <= 0.0 || !balance.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "initial balance must be positive (got: {balance})"
            )));
        }

        Ok(Self {
            balance,
            initial_balance: balance,
        })
    }

    /// Returns the balance the run started with.
    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Returns the current balance.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Takes funds out of the account (an order fill).
    ///
    /// Returns the debited amount. A debit above the balance fails with
    /// `Error::InsufficientBalance` and leaves the account untouched.
    pub(crate) fn debit(&mut self, amount: f64) -> Result<f64> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(Error::InvalidAmount(amount));
        }
        if amount - self.balance > self.balance * DEBIT_TOLERANCE {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance = (self.balance - amount).max(0.0);
        Ok(amount)
    }

    /// Puts funds back into the account (a position close).
    pub(crate) fn credit(&mut self, amount: f64) -> Result<f64> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(Error::InvalidAmount(amount));
        }
        self.balance += amount;
        Ok(self.balance)
    }

    /// Resets the account to its initial balance.
    pub(crate) fn reset(&mut self) {
        self.balance = self.initial_balance;
    }
}
