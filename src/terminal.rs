//! Line-oriented menu front end.
//!
//! Reads choices and fields from any `BufRead` and renders screens to any
//! `Write`, so the whole flow can be driven from tests. User errors are
//! printed and the menu continues; storage failures end the loop.

use crate::error::{AtmError, Result};
use crate::money::Money;
use crate::session::Session;
use crate::transaction::TransactionRecord;
use log::debug;
use std::io::{BufRead, Write};
use std::str::FromStr;

const SEPARATOR_WIDTH: usize = 30;

pub struct Terminal<R, W> {
    input: R,
    output: W,
    currency: String,
}

/// Whether the loop should keep going after a screen.
enum Flow {
    Continue,
    Quit,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W, currency: impl Into<String>) -> Self {
        Terminal {
            input,
            output,
            currency: currency.into(),
        }
    }

    /// Runs menus until the user quits or input ends.
    pub fn run(&mut self, session: &mut Session) -> Result<()> {
        writeln!(self.output, "Welcome to the ATM")?;
        loop {
            let flow = if session.current_session().is_some() {
                self.main_menu(session)?
            } else {
                self.login_menu(session)?
            };
            if let Flow::Quit = flow {
                break;
            }
        }
        self.output.flush()?;
        Ok(())
    }

    fn login_menu(&mut self, session: &mut Session) -> Result<Flow> {
        writeln!(self.output)?;
        writeln!(self.output, "1. Login")?;
        writeln!(self.output, "2. Register")?;
        writeln!(self.output, "3. Forgot Username/Password")?;
        writeln!(self.output, "4. Quit")?;
        let Some(choice) = self.prompt("Select an option: ")? else {
            return Ok(Flow::Quit);
        };

        match choice.trim() {
            "1" => self.login(session),
            "2" => self.register(session),
            "3" => self.recover(session),
            "4" => {
                writeln!(self.output, "Goodbye")?;
                Ok(Flow::Quit)
            }
            other => {
                debug!("Unknown login menu choice {:?}", other);
                writeln!(self.output, "Invalid option")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn main_menu(&mut self, session: &mut Session) -> Result<Flow> {
        writeln!(self.output)?;
        writeln!(self.output, "1. Check Balance")?;
        writeln!(self.output, "2. Withdraw")?;
        writeln!(self.output, "3. Deposit")?;
        writeln!(self.output, "4. Transaction History")?;
        writeln!(self.output, "5. Logout")?;
        let Some(choice) = self.prompt("Select an option: ")? else {
            return Ok(Flow::Quit);
        };

        match choice.trim() {
            "1" => {
                let balance = session.balance()?;
                writeln!(self.output, "Current Balance: {}{}", self.currency, balance)?;
                Ok(Flow::Continue)
            }
            "2" => self.withdraw(session),
            "3" => self.deposit(session),
            "4" => self.history(session),
            "5" => {
                session.logout();
                writeln!(self.output, "Logged out")?;
                Ok(Flow::Continue)
            }
            other => {
                debug!("Unknown main menu choice {:?}", other);
                writeln!(self.output, "Invalid option")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn login(&mut self, session: &mut Session) -> Result<Flow> {
        let Some(id) = self.prompt("Account Number: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(pin) = self.prompt("PIN: ")? else {
            return Ok(Flow::Quit);
        };

        match session.login(&id, &pin) {
            Ok(account) => {
                let greeting = format!("Welcome, {}", account.name);
                writeln!(self.output, "{}", greeting)?;
            }
            Err(e) => self.report(e, "")?,
        }
        Ok(Flow::Continue)
    }

    fn register(&mut self, session: &mut Session) -> Result<Flow> {
        let Some(id) = self.prompt("Account Number: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(pin) = self.prompt("PIN: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(name) = self.prompt("Full Name: ")? else {
            return Ok(Flow::Quit);
        };

        match session.register(&id, &pin, &name) {
            Ok(()) => writeln!(self.output, "Account registered successfully")?,
            Err(e) => self.report(e, "")?,
        }
        Ok(Flow::Continue)
    }

    fn recover(&mut self, session: &mut Session) -> Result<Flow> {
        let Some(name) = self.prompt("Enter Full Name: ")? else {
            return Ok(Flow::Quit);
        };

        match session.recover(&name) {
            Ok(matches) => {
                for (id, pin) in matches {
                    writeln!(self.output, "Account: {}, PIN: {}", id, pin)?;
                }
            }
            Err(e) => self.report(e, "")?,
        }
        Ok(Flow::Continue)
    }

    fn withdraw(&mut self, session: &mut Session) -> Result<Flow> {
        let Some(input) = self.prompt("Amount to withdraw: ")? else {
            return Ok(Flow::Quit);
        };

        match session.withdraw(&input) {
            Ok(receipt) => {
                writeln!(
                    self.output,
                    "Successfully withdrew {}{}",
                    self.currency, receipt.amount
                )?;
                writeln!(self.output, "New balance: {}{}", self.currency, receipt.balance)?;
            }
            Err(e) => self.report(e, &input)?,
        }
        Ok(Flow::Continue)
    }

    fn deposit(&mut self, session: &mut Session) -> Result<Flow> {
        let Some(input) = self.prompt("Amount to deposit: ")? else {
            return Ok(Flow::Quit);
        };

        match session.deposit(&input) {
            Ok(receipt) => {
                writeln!(
                    self.output,
                    "Successfully deposited {}{}",
                    self.currency, receipt.amount
                )?;
                writeln!(self.output, "New balance: {}{}", self.currency, receipt.balance)?;
            }
            Err(e) => self.report(e, &input)?,
        }
        Ok(Flow::Continue)
    }

    fn history(&mut self, session: &mut Session) -> Result<Flow> {
        let history = session.history()?;
        writeln!(self.output, "Transaction History")?;
        if history.is_empty() {
            writeln!(self.output, "No transactions found.")?;
        }
        for record in &history {
            self.write_record(record)?;
        }
        Ok(Flow::Continue)
    }

    fn write_record(&mut self, record: &TransactionRecord) -> Result<()> {
        writeln!(self.output, "Type: {}", record.kind)?;
        writeln!(self.output, "Amount: {}{}", self.currency, record.signed_amount.abs())?;
        writeln!(self.output, "Balance: {}{}", self.currency, record.resulting_balance)?;
        writeln!(
            self.output,
            "Time: {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(self.output, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        Ok(())
    }

    /// Prints a user error, or hands a fatal one back to the caller.
    fn report(&mut self, err: AtmError, input: &str) -> Result<()> {
        if !err.is_user_error() {
            return Err(err);
        }

        let message = match &err {
            AtmError::AlreadyExists(_) => "Account already exists".to_string(),
            AtmError::InsufficientFunds { .. } => "Insufficient funds".to_string(),
            AtmError::InvalidAmount(_) => match Money::from_str(input) {
                Err(_) => "Please enter a valid amount".to_string(),
                // Positive but rejected: the new balance would overflow.
                Ok(amount) if amount.is_positive() => "Amount is too large".to_string(),
                Ok(_) => "Please enter a positive amount".to_string(),
            },
            other => other.to_string(),
        };
        debug!("User error: {}", err);
        writeln!(self.output, "Error: {}", message)?;
        Ok(())
    }

    /// Writes `label` and reads one line. `None` means input has ended.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
        Ok(Some(trimmed))
    }

    /// Consumes the terminal and returns its output sink.
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_script(dir: &TempDir, script: &str) -> String {
        let mut session = Session::open(&Config::with_data_dir(dir.path())).unwrap();
        let mut terminal = Terminal::new(Cursor::new(script.to_string()), Vec::new(), "₹");
        terminal.run(&mut session).unwrap();
        String::from_utf8(terminal.into_output()).unwrap()
    }

    #[test]
    fn test_register_login_deposit_withdraw() {
        let dir = TempDir::new().unwrap();
        let output = run_script(
            &dir,
            "2\nA1\n1234\nAlice\n1\nA1\n1234\n3\n100\n2\n30\n1\n5\n4\n",
        );

        assert!(output.contains("Account registered successfully"));
        assert!(output.contains("Welcome, Alice"));
        assert!(output.contains("Successfully deposited ₹100.00"));
        assert!(output.contains("Successfully withdrew ₹30.00"));
        assert!(output.contains("New balance: ₹70.00"));
        assert!(output.contains("Current Balance: ₹70.00"));
        assert!(output.contains("Logged out"));
        assert!(output.ends_with("Goodbye\n"));
    }

    #[test]
    fn test_amount_error_messages() {
        let dir = TempDir::new().unwrap();
        let output = run_script(
            &dir,
            "2\nA1\n1234\nAlice\n1\nA1\n1234\n3\nabc\n3\n-5\n2\n10\n",
        );

        assert!(output.contains("Error: Please enter a valid amount"));
        assert!(output.contains("Error: Please enter a positive amount"));
        assert!(output.contains("Error: Insufficient funds"));
    }

    #[test]
    fn test_overflowing_deposit_message() {
        let dir = TempDir::new().unwrap();
        let huge = "50000000000000000000000000000";
        let output = run_script(
            &dir,
            &format!("2\nA1\n1234\nAlice\n1\nA1\n1234\n3\n{huge}\n3\n{huge}\n1\n"),
        );

        assert!(output.contains("Error: Amount is too large"));
        assert!(!output.contains("Error: Please enter a positive amount"));
        assert!(output.contains(&format!("Current Balance: ₹{huge}.00")));
    }

    #[test]
    fn test_login_menu_errors() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "1\nA1\n0000\n2\nA1\n\nAlice\n3\nNobody\n9\n");

        assert!(output.contains("Error: Invalid account number or PIN"));
        assert!(output.contains("Error: All fields are required"));
        assert!(output.contains("Error: No accounts found for the given name"));
        assert!(output.contains("Invalid option"));
    }

    #[test]
    fn test_duplicate_registration_message() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "2\nA1\n1234\nAlice\n2\nA1\n1\nBob\n");
        assert!(output.contains("Error: Account already exists"));
    }

    #[test]
    fn test_recovery_lists_matches() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "2\nA1\n1234\nAlice\n3\nAlice\n");
        assert!(output.contains("Account: A1, PIN: 1234"));
    }

    #[test]
    fn test_history_screen() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "2\nA1\n1234\nAlice\n1\nA1\n1234\n4\n3\n100\n2\n30\n4\n");

        assert!(output.contains("No transactions found."));
        assert!(output.contains("Type: Deposit\nAmount: ₹100.00\nBalance: ₹100.00\n"));
        assert!(output.contains("Type: Withdrawal\nAmount: ₹30.00\nBalance: ₹70.00\n"));
        assert!(output.contains(&"-".repeat(30)));
    }

    #[test]
    fn test_end_of_input_stops_cleanly() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "");
        assert!(output.starts_with("Welcome to the ATM"));
    }

    #[test]
    fn test_crlf_input() {
        let dir = TempDir::new().unwrap();
        let output = run_script(&dir, "2\r\nA1\r\n1234\r\nAlice\r\n1\r\nA1\r\n1234\r\n");
        assert!(output.contains("Welcome, Alice"));
    }
}
