//! Orchestration of user actions against the account store and the
//! transaction log.
//!
//! Every mutating action follows the same sequence: validate input, apply it
//! to the account store, and only on success append the matching record to
//! the transaction log. Both stores persist themselves before returning.

use crate::account::Account;
use crate::account_store::AccountStore;
use crate::config::Config;
use crate::error::{AtmError, Result};
use crate::money::Money;
use crate::transaction::{TransactionLog, TransactionRecord, TxKind};
use log::{debug, info, warn};
use std::fs;
use std::str::FromStr;

/// Outcome of a successful deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub amount: Money,
    pub balance: Money,
}

/// The running ATM: both stores plus the currently logged-in account.
#[derive(Debug)]
pub struct Session {
    accounts: AccountStore,
    log: TransactionLog,
    current: Option<String>,
}

impl Session {
    /// Creates a session over already loaded stores. Nobody is logged in.
    pub fn new(accounts: AccountStore, log: TransactionLog) -> Self {
        Session {
            accounts,
            log,
            current: None,
        }
    }

    /// Loads both stores from the locations in `config`.
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(config.data_dir())
            .map_err(|e| AtmError::storage(config.data_dir(), e))?;
        let accounts = AccountStore::load(config.accounts_path())?;
        let log = TransactionLog::load(config.transactions_path())?;
        let session = Session::new(accounts, log);
        session.check_histories();
        Ok(session)
    }

    /// Logs a warning for every account whose balance disagrees with a replay
    /// of its transaction history.
    pub fn check_histories(&self) -> usize {
        let mut inconsistent = 0;
        for (id, account) in self.accounts.iter() {
            match self.log.replayed_balance(id) {
                Ok(replayed) if replayed == account.balance => {}
                Ok(replayed) => {
                    inconsistent += 1;
                    warn!(
                        "Account {}: balance {} but history replays to {}",
                        id, account.balance, replayed
                    );
                }
                Err(mismatch) => {
                    inconsistent += 1;
                    warn!(
                        "Account {}: history record {} shows balance {}, replay gives {}",
                        id, mismatch.index, mismatch.recorded, mismatch.expected
                    );
                }
            }
        }
        inconsistent
    }

    /// Identifier of the logged-in account, if any.
    pub fn current_session(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.log
    }

    /// Registers a new account. Does not log it in.
    pub fn register(&mut self, id: &str, pin: &str, name: &str) -> Result<()> {
        self.accounts.register(id, pin, name)?;
        info!("Account {} registered", id);
        Ok(())
    }

    /// Authenticates and makes `id` the current account.
    pub fn login(&mut self, id: &str, pin: &str) -> Result<&Account> {
        self.accounts.authenticate(id, pin)?;
        self.current = Some(id.to_string());
        info!("Account {} logged in", id);
        self.current_account()
    }

    /// Clears the current account.
    pub fn logout(&mut self) {
        if let Some(id) = self.current.take() {
            info!("Account {} logged out", id);
        }
    }

    /// The logged-in account's record.
    pub fn current_account(&self) -> Result<&Account> {
        let id = self.require_login()?;
        self.accounts
            .get(id)
            .ok_or_else(|| AtmError::AccountNotFound(id.to_string()))
    }

    /// Balance of the logged-in account.
    pub fn balance(&self) -> Result<Money> {
        Ok(self.current_account()?.balance)
    }

    /// Parses `input` and deposits it into the logged-in account.
    pub fn deposit(&mut self, input: &str) -> Result<Receipt> {
        let id = self.require_login()?.to_string();
        let amount = parse_amount(input)?;

        let balance = self.accounts.deposit(&id, amount)?;
        self.log.append(&id, TxKind::Deposit, amount, balance)?;
        Ok(Receipt { amount, balance })
    }

    /// Parses `input` and withdraws it from the logged-in account.
    pub fn withdraw(&mut self, input: &str) -> Result<Receipt> {
        let id = self.require_login()?.to_string();
        let amount = parse_amount(input)?;

        let balance = self.accounts.withdraw(&id, amount)?;
        self.log.append(&id, TxKind::Withdrawal, -amount, balance)?;
        Ok(Receipt { amount, balance })
    }

    /// Transaction history of the logged-in account, oldest first.
    pub fn history(&self) -> Result<Vec<TransactionRecord>> {
        let id = self.require_login()?;
        Ok(self.log.history_for(id))
    }

    /// Looks up accounts by holder name for recovery.
    ///
    /// Returns `(id, pin)` pairs and requires no login, exactly like the
    /// legacy recovery screen. Anyone who knows a holder's name learns their
    /// PIN.
    pub fn recover(&self, name: &str) -> Result<Vec<(String, String)>> {
        let matches = self.accounts.find_by_name(name);
        if matches.is_empty() {
            return Err(AtmError::NoMatchingAccounts);
        }
        debug!("Recovery for name {:?} matched {} accounts", name, matches.len());
        Ok(matches)
    }

    fn require_login(&self) -> Result<&str> {
        self.current.as_deref().ok_or(AtmError::NotAuthenticated)
    }
}

/// Parses user-entered money; anything unparsable is an invalid amount.
pub fn parse_amount(input: &str) -> Result<Money> {
    let amount =
        Money::from_str(input).map_err(|_| AtmError::InvalidAmount(input.trim().to_string()))?;
    if !amount.is_positive() {
        return Err(AtmError::InvalidAmount(input.trim().to_string()));
    }
    Ok(amount)
}
