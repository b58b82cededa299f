//! Interactive password acquisition
//!
//! One call opens the terminal, reads one entry (or two, when a new secret
//! is being set), checks it, closes the terminal, and leaves the password
//! in the caller's buffer as UTF-16LE. All intermediate storage is wiped
//! before the call returns, whatever the outcome.

use tracing::{debug, warn};

use crate::MAX_PASSWORD_LEN;
use crate::error::{ErrorKind, PassphraseError, Result};
use crate::secret::SecretBuffer;
use crate::terminal::{Session, Terminal};
use crate::transcode::Transcoder;

/// Whether the password protects new data or unlocks existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A new secret: the password is asked for twice and must match.
    Encrypt,
    /// An existing secret: the password is asked for once.
    Decrypt,
}

impl Mode {
    fn confirms(self) -> bool {
        self == Mode::Encrypt
    }
}

/// Texts written to the terminal before each entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub first: String,
    pub confirm: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            first: "Enter password: ".to_string(),
            confirm: "Re-Enter password: ".to_string(),
        }
    }
}

/// Storage for both entries of one acquisition.
pub(crate) struct Entries<U: Copy + Default + PartialEq + zeroize::Zeroize> {
    pub(crate) first: SecretBuffer<U>,
    pub(crate) confirm: SecretBuffer<U>,
}

impl<U: Copy + Default + PartialEq + zeroize::Zeroize> Entries<U> {
    pub(crate) fn new() -> Self {
        Self {
            first: SecretBuffer::new(),
            confirm: SecretBuffer::new(),
        }
    }

    fn wipe(&mut self) {
        self.first.wipe();
        self.confirm.wipe();
    }
}

/// Reads a password from a [`Terminal`] and encodes it with a [`Transcoder`].
pub struct PasswordReader<X: Transcoder> {
    transcoder: X,
    prompts: Prompts,
}

impl<X: Transcoder> PasswordReader<X> {
    pub fn new(transcoder: X) -> Self {
        Self {
            transcoder,
            prompts: Prompts::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn transcoder(&self) -> &X {
        &self.transcoder
    }

    /// Acquires a password on `terminal` and writes it to `out` as UTF-16LE.
    ///
    /// Returns the number of bytes written. `out` should hold
    /// [`ENCODED_CAPACITY`](crate::ENCODED_CAPACITY) bytes; a smaller buffer
    /// fails with an `Oversize` encoding error once the password does not fit.
    /// `out` is only written after every check has passed.
    ///
    /// The terminal is closed and its echo state restored before this
    /// returns, on success and on every error.
    pub fn read<T>(&self, terminal: &mut T, mode: Mode, out: &mut [u8]) -> Result<usize>
    where
        T: Terminal<Unit = X::Unit>,
    {
        let mut entries = Entries::new();
        self.read_with(terminal, mode, out, &mut entries)
    }

    pub(crate) fn read_with<T>(
        &self,
        terminal: &mut T,
        mode: Mode,
        out: &mut [u8],
        entries: &mut Entries<X::Unit>,
    ) -> Result<usize>
    where
        T: Terminal<Unit = X::Unit>,
    {
        debug!(?mode, "acquiring password");
        let result = self.acquire(terminal, mode, out, entries);
        entries.wipe();
        match &result {
            Ok(_) => debug!(?mode, "password acquired"),
            Err(err) => debug!(?mode, kind = ?err.kind, "password acquisition failed"),
        }
        result
    }

    fn acquire<T>(
        &self,
        terminal: &mut T,
        mode: Mode,
        out: &mut [u8],
        entries: &mut Entries<X::Unit>,
    ) -> Result<usize>
    where
        T: Terminal<Unit = X::Unit>,
    {
        {
            let mut session = Session::new(terminal);
            read_entry(session.terminal(), &self.prompts.first, &mut entries.first)?;
            if mode.confirms() {
                read_entry(session.terminal(), &self.prompts.confirm, &mut entries.confirm)?;
            }
        }

        if mode.confirms() {
            let matched = entries.first.matches(&entries.confirm);
            entries.confirm.wipe();
            if !matched {
                return Err(ErrorKind::PasswordMismatch.into());
            }
        }

        let encoded = self
            .transcoder
            .transcode(entries.first.as_slice(), MAX_PASSWORD_LEN, out);
        entries.first.wipe();
        encoded
    }
}

/// One prompt-and-read pass with echo off.
///
/// A read failure or end of input takes precedence over a failure to turn
/// echo back on; the latter is still returned when nothing else went wrong.
fn read_entry<T: Terminal>(
    terminal: &mut T,
    prompt: &str,
    entry: &mut SecretBuffer<T::Unit>,
) -> Result<()> {
    debug!("password entry started");
    terminal.write_prompt(prompt)?;
    terminal.disable_echo()?;

    let outcome = read_line(terminal, entry);
    let newline = terminal.write_prompt("\n");
    let restored = terminal.restore_echo();
    if let Err(err) = &restored {
        warn!(error = %err, "failed to turn terminal echo back on");
    }

    outcome?;
    if entry.is_overlong() {
        return Err(PassphraseError::new(
            ErrorKind::PasswordTooLong,
            format!("password exceeds {} input units", MAX_PASSWORD_LEN),
        ));
    }
    restored?;
    newline?;
    entry.terminate();
    debug!("password entry finished");
    Ok(())
}

/// Consumes units up to the line terminator. Units past the buffer's
/// capacity are drained and counted but not stored.
fn read_line<T: Terminal>(terminal: &mut T, entry: &mut SecretBuffer<T::Unit>) -> Result<()> {
    loop {
        match terminal.read_char()? {
            Some(unit) if unit == T::LINE_END => return Ok(()),
            Some(unit) => entry.push(unit),
            None => {
                return Err(PassphraseError::new(
                    ErrorKind::UnexpectedEndOfInput,
                    "input closed before the end of the line",
                ));
            }
        }
    }
}
