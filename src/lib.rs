//! # ATM Machine
//!
//! A single-user ATM simulator: registration, PIN login, balance inquiry,
//! deposits, withdrawals, transaction history and name-based account
//! recovery, with state kept in two JSON files.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Money has 2 decimal places via `rust_decimal`
//! - **Persist before reporting**: every successful mutation is on disk
//!   before the caller sees it
//! - **Replayable history**: summing an account's signed amounts from zero
//!   reproduces every recorded balance
//! - **Deterministic lookups**: accounts are ordered by identifier
//!
//! ## Example
//!
//! ```no_run
//! use atm_machine::{Config, Session};
//!
//! let mut session = Session::open(&Config::with_data_dir(".")).unwrap();
//! session.register("A1", "1234", "Alice").unwrap();
//! session.login("A1", "1234").unwrap();
//! session.deposit("100").unwrap();
//! assert_eq!(session.balance().unwrap().to_string(), "100.00");
//! ```

pub mod account;
pub mod account_store;
pub mod config;
pub mod error;
pub mod money;
pub mod session;
pub mod storage;
pub mod terminal;
pub mod transaction;

pub use account::Account;
pub use account_store::AccountStore;
pub use config::{Command, Config};
pub use error::{AtmError, Result};
pub use money::Money;
pub use session::{Receipt, Session};
pub use terminal::Terminal;
pub use transaction::{HistoryMismatch, TransactionLog, TransactionRecord, TxKind};
