//! Account table mirrored to the accounts file.
//!
//! Every successful mutation is persisted before it is reported, so a crash
//! right after a successful call never loses it.

use crate::account::Account;
use crate::error::{AtmError, Result};
use crate::money::Money;
use crate::storage;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Owns every registered account, keyed by account identifier.
///
/// Accounts are kept ordered by identifier, so lookups that return several
/// accounts do so in a deterministic order.
#[derive(Debug)]
pub struct AccountStore {
    path: PathBuf,
    accounts: BTreeMap<String, Account>,
}

impl AccountStore {
    /// Loads the store from `path`, creating an empty file if none exists.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let accounts: BTreeMap<String, Account> = storage::load_or_init(&path)?;
        info!("Loaded {} accounts", accounts.len());
        Ok(AccountStore { path, accounts })
    }

    /// Writes the full table to the backing file.
    pub fn persist(&self) -> Result<()> {
        storage::write_atomic(&self.path, &self.accounts)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a new account with a zero balance.
    pub fn register(&mut self, id: &str, pin: &str, name: &str) -> Result<()> {
        if id.is_empty() || pin.is_empty() || name.is_empty() {
            return Err(AtmError::InvalidInput);
        }

        if self.accounts.contains_key(id) {
            return Err(AtmError::AlreadyExists(id.to_string()));
        }

        self.accounts.insert(id.to_string(), Account::new(pin, name));
        if let Err(e) = self.persist() {
            self.accounts.remove(id);
            return Err(e);
        }
        debug!("Registered account {}", id);
        Ok(())
    }

    /// Returns the account if `id` exists and `pin` matches its stored PIN.
    pub fn authenticate(&self, id: &str, pin: &str) -> Result<&Account> {
        match self.accounts.get(id) {
            Some(account) if account.verify_pin(pin) => Ok(account),
            _ => {
                debug!("Failed login for account {}", id);
                Err(AtmError::InvalidCredentials)
            }
        }
    }

    /// Credits `amount` and returns the new balance.
    pub fn deposit(&mut self, id: &str, amount: Money) -> Result<Money> {
        let account = self.account_mut(id)?;
        let previous = account.balance;
        let balance = account.deposit(amount)?;
        self.commit(id, previous)?;
        debug!("Deposited {} to account {}, balance {}", amount, id, balance);
        Ok(balance)
    }

    /// Debits `amount` and returns the new balance.
    pub fn withdraw(&mut self, id: &str, amount: Money) -> Result<Money> {
        let account = self.account_mut(id)?;
        let previous = account.balance;
        let balance = account.withdraw(amount)?;
        self.commit(id, previous)?;
        debug!("Withdrew {} from account {}, balance {}", amount, id, balance);
        Ok(balance)
    }

    /// Returns `(id, pin)` for every account whose name matches exactly.
    ///
    /// This discloses PINs to anyone who knows an account holder's name. It is
    /// the documented recovery behavior, not a security property.
    pub fn find_by_name(&self, name: &str) -> Vec<(String, String)> {
        self.accounts
            .iter()
            .filter(|(_, account)| account.name == name)
            .map(|(id, account)| (id.clone(), account.pin.clone()))
            .collect()
    }

    /// Looks up an account without checking credentials.
    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// Current balance of an account.
    pub fn balance(&self, id: &str) -> Result<Money> {
        self.get(id)
            .map(|a| a.balance)
            .ok_or_else(|| AtmError::AccountNotFound(id.to_string()))
    }

    /// Iterates over `(id, account)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Account)> {
        self.accounts.iter().map(|(id, a)| (id.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Persists a balance change, restoring `previous` if the write fails so
    /// memory never runs ahead of the file.
    fn commit(&mut self, id: &str, previous: Money) -> Result<()> {
        if let Err(e) = self.persist() {
            if let Some(account) = self.accounts.get_mut(id) {
                account.balance = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    fn account_mut(&mut self, id: &str) -> Result<&mut Account> {
        self.accounts
            .get_mut(id)
            .ok_or_else(|| AtmError::AccountNotFound(id.to_string()))
    }
}
