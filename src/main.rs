//! ATM Machine CLI
//!
//! Interactive menu over stdin/stdout. Accounts and transaction history are
//! kept in `accounts.json` and `transactions.json` in the data directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --data-dir ./data
//! ```
//!
//! # Environment Variables
//!
//! - `ATM_DATA_DIR`: Data directory when `--data-dir` is not given
//! - `ATM_CURRENCY`: Currency symbol shown before amounts
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use atm_machine::config::USAGE;
use atm_machine::{Command, Config, Result, Session, Terminal};
use std::io;
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match Config::from_env()? {
        Command::Run(config) => config,
        Command::Help => {
            print!("{}", USAGE);
            return Ok(());
        }
    };
    log::debug!("Using data directory {}", config.data_dir().display());

    let mut session = Session::open(&config)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut terminal = Terminal::new(stdin.lock(), stdout.lock(), config.currency.clone());
    terminal.run(&mut session)?;

    Ok(())
}
