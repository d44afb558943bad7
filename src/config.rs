//! Runtime configuration from command line arguments and environment.
//!
//! - `--data-dir <dir>` or `ATM_DATA_DIR`: directory holding the data files
//!   (default: current directory). The flag wins over the variable.
//! - `ATM_CURRENCY`: symbol printed before amounts (default: `₹`).

use crate::error::{AtmError, Result};
use std::path::{Path, PathBuf};

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const DEFAULT_CURRENCY: &str = "₹";

pub const DATA_DIR_ENV: &str = "ATM_DATA_DIR";
pub const CURRENCY_ENV: &str = "ATM_CURRENCY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub currency: String,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Config),
    Help,
}

impl Config {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Parses arguments (without the program name), using `env` for
    /// anything the arguments leave unset.
    pub fn from_args<I, F>(args: I, env: F) -> Result<Command>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut data_dir = env(DATA_DIR_ENV).map(PathBuf::from);

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => {
                    let dir = args
                        .next()
                        .ok_or_else(|| AtmError::Usage("Missing value for --data-dir".into()))?;
                    data_dir = Some(PathBuf::from(dir));
                }
                "-h" | "--help" => return Ok(Command::Help),
                other => return Err(AtmError::Usage(format!("Unknown argument {:?}", other))),
            }
        }

        let mut config = Config::with_data_dir(data_dir.unwrap_or_else(|| PathBuf::from(".")));
        if let Some(currency) = env(CURRENCY_ENV).filter(|c| !c.is_empty()) {
            config.currency = currency;
        }
        Ok(Command::Run(config))
    }

    /// Parses the real process arguments and environment.
    pub fn from_env() -> Result<Command> {
        Config::from_args(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_FILE)
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.data_dir.join(TRANSACTIONS_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

pub const USAGE: &str = "\
Usage: atm-machine [--data-dir <dir>]

Options:
  --data-dir <dir>  Directory for accounts.json and transactions.json [env: ATM_DATA_DIR]
  -h, --help        Print this help

Environment:
  ATM_CURRENCY      Currency symbol shown before amounts (default: ₹)
  RUST_LOG          Log level for diagnostics on stderr (e.g. debug, warn)
";

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cmd = Config::from_args(args(&[]), no_env).unwrap();
        let Command::Run(config) = cmd else {
            panic!("expected Run");
        };
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.currency, "₹");
        assert_eq!(config.accounts_path(), PathBuf::from("./accounts.json"));
        assert_eq!(
            config.transactions_path(),
            PathBuf::from("./transactions.json")
        );
    }

    #[test]
    fn test_flag_overrides_env() {
        let env = |key: &str| match key {
            DATA_DIR_ENV => Some("/from/env".to_string()),
            CURRENCY_ENV => Some("$".to_string()),
            _ => None,
        };

        let cmd = Config::from_args(args(&[]), env).unwrap();
        assert_eq!(
            cmd,
            Command::Run(Config {
                data_dir: PathBuf::from("/from/env"),
                currency: "$".to_string(),
            })
        );

        let cmd = Config::from_args(args(&["--data-dir", "/from/flag"]), env).unwrap();
        let Command::Run(config) = cmd else {
            panic!("expected Run");
        };
        assert_eq!(config.data_dir(), Path::new("/from/flag"));
    }

    #[test]
    fn test_help() {
        assert_eq!(
            Config::from_args(args(&["--help"]), no_env).unwrap(),
            Command::Help
        );
    }

    #[test]
    fn test_usage_errors() {
        assert!(matches!(
            Config::from_args(args(&["--data-dir"]), no_env),
            Err(AtmError::Usage(_))
        ));
        assert!(matches!(
            Config::from_args(args(&["--verbose"]), no_env),
            Err(AtmError::Usage(_))
        ));
    }
}
