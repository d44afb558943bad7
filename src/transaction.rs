//! Transaction records and the per-account transaction log.

use crate::error::Result;
use crate::money::Money;
use crate::storage;
use chrono::{Local, NaiveDateTime, Timelike};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    /// Credit to the account; recorded with a positive amount.
    Deposit,

    /// Debit from the account; recorded with a negative amount.
    Withdrawal,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Deposit => f.write_str("Deposit"),
            TxKind::Withdrawal => f.write_str("Withdrawal"),
        }
    }
}

/// One completed deposit or withdrawal, as stored in the transactions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: TxKind,

    /// Signed amount: positive for deposits, negative for withdrawals.
    #[serde(rename = "amount")]
    pub signed_amount: Money,

    /// Local wall-clock time the record was appended, second resolution.
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,

    /// Account balance right after this transaction.
    #[serde(rename = "balance")]
    pub resulting_balance: Money,
}

/// Raised when replaying an account's history does not reproduce a recorded
/// balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMismatch {
    /// Zero-based position of the first record that disagrees.
    pub index: usize,
    pub expected: Money,
    pub recorded: Money,
}

/// Ordered transaction history for every account, mirrored to the
/// transactions file.
#[derive(Debug)]
pub struct TransactionLog {
    path: PathBuf,
    entries: BTreeMap<String, Vec<TransactionRecord>>,
}

impl TransactionLog {
    /// Loads the log from `path`, creating an empty file if none exists.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, Vec<TransactionRecord>> = storage::load_or_init(&path)?;
        info!(
            "Loaded transaction history for {} accounts",
            entries.len()
        );
        Ok(TransactionLog { path, entries })
    }

    /// Writes the full log to the backing file.
    pub fn persist(&self) -> Result<()> {
        storage::write_atomic(&self.path, &self.entries)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record stamped with the current local time, then persists.
    pub fn append(
        &mut self,
        id: &str,
        kind: TxKind,
        signed_amount: Money,
        resulting_balance: Money,
    ) -> Result<()> {
        let now = Local::now().naive_local();
        // Stored with second resolution; drop the fraction so in-memory and
        // reloaded records compare equal.
        let now = now.with_nanosecond(0).unwrap_or(now);
        self.append_at(id, kind, signed_amount, resulting_balance, now)
    }

    /// Appends a record with an explicit timestamp, then persists.
    pub fn append_at(
        &mut self,
        id: &str,
        kind: TxKind,
        signed_amount: Money,
        resulting_balance: Money,
        timestamp: NaiveDateTime,
    ) -> Result<()> {
        self.entries
            .entry(id.to_string())
            .or_default()
            .push(TransactionRecord {
                kind,
                signed_amount,
                timestamp,
                resulting_balance,
            });
        if let Err(e) = self.persist() {
            self.discard_last(id);
            return Err(e);
        }
        debug!(
            "Logged {} of {} for account {}, balance {}",
            kind, signed_amount, id, resulting_balance
        );
        Ok(())
    }

    fn discard_last(&mut self, id: &str) {
        if let Some(records) = self.entries.get_mut(id) {
            records.pop();
            if records.is_empty() {
                self.entries.remove(id);
            }
        }
    }

    /// Returns a snapshot of the account's history, oldest first.
    pub fn history_for(&self, id: &str) -> Vec<TransactionRecord> {
        self.entries.get(id).cloned().unwrap_or_default()
    }

    /// Replays the account's history from zero and returns the final balance.
    ///
    /// Fails on the first record whose stored balance differs from the
    /// running sum of signed amounts.
    pub fn replayed_balance(&self, id: &str) -> std::result::Result<Money, HistoryMismatch> {
        let mut running = Money::ZERO;
        for (index, record) in self.entries.get(id).into_iter().flatten().enumerate() {
            running += record.signed_amount;
            if running != record.resulting_balance {
                return Err(HistoryMismatch {
                    index,
                    expected: running,
                    recorded: record.resulting_balance,
                });
            }
        }
        Ok(running)
    }
}

/// Serde adapter for the `YYYY-MM-DD HH:MM:SS` timestamp format.
mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtmError;
    use std::fs;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn new_log(dir: &TempDir) -> TransactionLog {
        TransactionLog::load(dir.path().join("transactions.json")).unwrap()
    }

    #[test]
    fn test_empty_history() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);

        assert!(log.history_for("A1").is_empty());
        assert_eq!(log.replayed_balance("A1"), Ok(Money::ZERO));
        assert!(log.path().exists());
    }

    #[test]
    fn test_history_is_in_append_order() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        log.append("A1", TxKind::Deposit, money("100"), money("100"))
            .unwrap();
        log.append("B2", TxKind::Deposit, money("5"), money("5"))
            .unwrap();
        log.append("A1", TxKind::Withdrawal, money("-30"), money("70"))
            .unwrap();

        let history = log.history_for("A1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TxKind::Deposit);
        assert_eq!(history[0].signed_amount, money("100"));
        assert_eq!(history[1].kind, TxKind::Withdrawal);
        assert_eq!(history[1].signed_amount, money("-30"));
        assert_eq!(history[1].resulting_balance, money("70"));
        assert_eq!(log.replayed_balance("A1"), Ok(money("70")));
    }

    #[test]
    fn test_history_snapshots_are_independent() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        log.append("A1", TxKind::Deposit, money("1"), money("1"))
            .unwrap();

        let first = log.history_for("A1");
        log.append("A1", TxKind::Deposit, money("1"), money("2"))
            .unwrap();
        let second = log.history_for("A1");

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        log.append("A1", TxKind::Deposit, money("100"), money("100"))
            .unwrap();
        log.append("A1", TxKind::Withdrawal, money("-30"), money("70"))
            .unwrap();

        let reloaded = new_log(&dir);
        assert_eq!(reloaded.history_for("A1"), log.history_for("A1"));
    }

    #[test]
    fn test_failed_persist_drops_the_record() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        let mut log = TransactionLog::load(data.join("transactions.json")).unwrap();
        log.append("A1", TxKind::Deposit, money("100"), money("100"))
            .unwrap();

        fs::remove_dir_all(&data).unwrap();

        let err = log
            .append("A1", TxKind::Withdrawal, money("-30"), money("70"))
            .unwrap_err();
        assert!(matches!(err, AtmError::Storage { .. }));
        assert!(log
            .append("B2", TxKind::Deposit, money("5"), money("5"))
            .is_err());

        assert_eq!(log.history_for("A1").len(), 1);
        assert_eq!(log.replayed_balance("A1"), Ok(money("100")));
        assert!(log.history_for("B2").is_empty());
        assert!(!log.entries.contains_key("B2"));
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        log.append_at(
            "A1",
            TxKind::Withdrawal,
            money("-30"),
            money("70"),
            at("2024-01-02 03:04:05"),
        )
        .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let record = &json["A1"][0];
        assert_eq!(record["type"], "withdrawal");
        assert_eq!(record["amount"], -30.0);
        assert_eq!(record["timestamp"], "2024-01-02 03:04:05");
        assert_eq!(record["balance"], 70.0);
    }

    #[test]
    fn test_replay_detects_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("transactions.json"),
            r#"{"A1": [
                {"type": "deposit", "amount": 100.0, "timestamp": "2024-01-01 00:00:00", "balance": 100.0},
                {"type": "withdrawal", "amount": -30.0, "timestamp": "2024-01-01 00:00:01", "balance": 60.0}
            ]}"#,
        )
        .unwrap();

        let log = new_log(&dir);
        assert_eq!(
            log.replayed_balance("A1"),
            Err(HistoryMismatch {
                index: 1,
                expected: money("70"),
                recorded: money("60"),
            })
        );
    }

    #[test]
    fn test_bad_timestamp_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        fs::write(
            &path,
            r#"{"A1": [{"type": "deposit", "amount": 1.0, "timestamp": "yesterday", "balance": 1.0}]}"#,
        )
        .unwrap();

        assert!(TransactionLog::load(&path).is_err());
    }

    #[test]
    fn test_kind_display_is_capitalized() {
        assert_eq!(TxKind::Deposit.to_string(), "Deposit");
        assert_eq!(TxKind::Withdrawal.to_string(), "Withdrawal");
    }
}
