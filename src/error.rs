//! Error types for the ATM.

use std::path::PathBuf;
use thiserror::Error;

use crate::money::Money;

/// Result type alias for ATM operations
pub type Result<T> = std::result::Result<T, AtmError>;

/// Errors that can occur while operating the ATM.
///
/// The first group are user-facing conditions: they are reported and the
/// session carries on. The storage and usage variants are fatal.
#[derive(Error, Debug)]
pub enum AtmError {
    /// A required field was left empty
    #[error("All fields are required")]
    InvalidInput,

    /// Registration with an identifier that is already taken
    #[error("Account {0} already exists")]
    AlreadyExists(String),

    /// Unknown account or PIN mismatch
    #[error("Invalid account number or PIN")]
    InvalidCredentials,

    /// Non-positive or unparsable monetary amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal larger than the current balance
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Money, available: Money },

    /// Balance operation against an identifier with no account
    #[error("Account {0} not found")]
    AccountNotFound(String),

    /// Account action attempted with nobody logged in
    #[error("Not logged in")]
    NotAuthenticated,

    /// Recovery lookup matched nothing
    #[error("No accounts found for the given name")]
    NoMatchingAccounts,

    /// I/O failure outside of a specific backing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or write a backing file
    #[error("Storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: Box<AtmError>,
    },

    /// Bad command line
    #[error("{0}. Usage: atm-machine [--data-dir <dir>]")]
    Usage(String),
}

impl AtmError {
    /// Returns `true` for conditions the user can correct by re-entering input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AtmError::InvalidInput
                | AtmError::AlreadyExists(_)
                | AtmError::InvalidCredentials
                | AtmError::InvalidAmount(_)
                | AtmError::InsufficientFunds { .. }
                | AtmError::AccountNotFound(_)
                | AtmError::NotAuthenticated
                | AtmError::NoMatchingAccounts
        )
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: impl Into<AtmError>) -> Self {
        AtmError::Storage {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(AtmError::InvalidInput.is_user_error());
        assert!(AtmError::InvalidCredentials.is_user_error());
        assert!(AtmError::NotAuthenticated.is_user_error());
        assert!(AtmError::InsufficientFunds {
            requested: Money::ZERO,
            available: Money::ZERO,
        }
        .is_user_error());
    }

    #[test]
    fn test_storage_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = AtmError::storage("accounts.json", io);
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("accounts.json"));
        assert!(!AtmError::Usage("bad flag".into()).is_user_error());
    }
}
