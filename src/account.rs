//! Account model and balance operations.
//!
//! Maintains the invariant: `balance >= 0` at all times.

use crate::error::{AtmError, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A registered account as stored in the accounts file.
///
/// The identifier is not part of the record; it is the key under which the
/// record is stored.
///
/// # Invariants
///
/// - `balance` never drops below zero: withdrawals larger than the balance
///   are rejected without touching it
/// - Amounts passed to `deposit`/`withdraw` must be strictly positive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// PIN compared by exact string equality.
    pub pin: String,

    /// Current balance.
    pub balance: Money,

    /// Display name. Not unique across accounts.
    pub name: String,
}

impl Account {
    /// Creates a new account with a zero balance.
    pub fn new(pin: impl Into<String>, name: impl Into<String>) -> Self {
        Account {
            pin: pin.into(),
            balance: Money::ZERO,
            name: name.into(),
        }
    }

    /// Checks a supplied PIN against the stored one.
    ///
    /// Plain equality; this is the only place credentials are compared.
    pub fn verify_pin(&self, pin: &str) -> bool {
        self.pin == pin
    }

    /// Deposits funds into the account and returns the new balance.
    pub fn deposit(&mut self, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(AtmError::InvalidAmount(amount.to_string()));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| AtmError::InvalidAmount(amount.to_string()))?;
        Ok(self.balance)
    }

    /// Withdraws funds from the account and returns the new balance.
    ///
    /// Fails with `InsufficientFunds` if `amount > balance`; the balance is
    /// left unchanged.
    pub fn withdraw(&mut self, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(AtmError::InvalidAmount(amount.to_string()));
        }

        if amount > self.balance {
            return Err(AtmError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }

        self.balance -= amount;
        Ok(self.balance)
    }
}
