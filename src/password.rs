//! Password reading functionality

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PasswordReader {
    /// Read a password.
    ///
    /// Browsers hand the decryptor text, so passwords must be UTF-8. The
    /// result is wrapped in `Zeroizing` to ensure it is securely wiped from
    /// memory when dropped.
    fn read_password(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed password (for testing, and for generated passwords)
pub struct ConstantPasswordReader {
    password: Zeroizing<String>,
}

impl ConstantPasswordReader {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        Ok(self.password.clone())
    }
}

/// Reads a password from any io::Read source
///
/// Everything up to EOF is the password, except that a single trailing
/// line ending is dropped so `echo secret | pagecrypt ...` does what it
/// looks like.
pub struct ReaderPasswordReader {
    reader: Box<dyn Read>,
}

impl ReaderPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for ReaderPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            PagecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;

        let mut end = data.len();
        if data[..end].ends_with(b"\n") {
            end -= 1;
            if data[..end].ends_with(b"\r") {
                end -= 1;
            }
        }

        let password = std::str::from_utf8(&data[..end]).map_err(|e| {
            PagecryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "password is not valid UTF-8",
                e,
            )
        })?;
        Ok(Zeroizing::new(password.to_string()))
    }
}

/// Reads a password from terminal with no echo
///
/// With confirmation enabled the password is asked for twice, since a typo
/// when encrypting would make the page impossible to open.
pub struct TerminalPasswordReader {
    confirm: bool,
}

impl TerminalPasswordReader {
    pub fn new(confirm: bool) -> Self {
        Self { confirm }
    }

    fn prompt(&self, prompt: &str) -> Result<Zeroizing<String>> {
        io::stderr().write_all(prompt.as_bytes()).map_err(|e| {
            PagecryptError::io(
                ErrorCategory::Internal,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            PagecryptError::io(
                ErrorCategory::Internal,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read password *without echo*
        // Note: rpassword returns a plain String, so wrap it immediately
        let password = rpassword::read_password().map_err(|e| {
            PagecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(password))
    }
}

impl PasswordReader for TerminalPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(PagecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let password = self.prompt("Password (pagecrypt): ")?;
        if self.confirm {
            let again = self.prompt("Confirm password: ")?;
            if *password != *again {
                return Err(PagecryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PasswordUnavailable,
                    "passwords do not match",
                ));
            }
        }
        Ok(password)
    }
}
