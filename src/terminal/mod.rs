//! Terminal access with local echo control
//!
//! The password reader only talks to the [`Terminal`] trait. The platform
//! implementation is picked at build time ([`PlatformTerminal`]), and
//! [`ReaderTerminal`] drives the same code from any `io::Read` source.

use std::io::{self, Read};

use tracing::debug;
use zeroize::Zeroize;

use crate::error::{ErrorKind, PassphraseError, Result};

#[cfg(windows)]
mod console;
#[cfg(unix)]
mod posix;

#[cfg(windows)]
pub use console::ConsoleTerminal;
#[cfg(unix)]
pub use posix::PosixTerminal;

/// The controlling-terminal implementation for the build target.
#[cfg(unix)]
pub type PlatformTerminal = PosixTerminal;
#[cfg(windows)]
pub type PlatformTerminal = ConsoleTerminal;

/// An opened terminal session.
///
/// Implementations remember whether [`disable_echo`](Terminal::disable_echo)
/// actually switched echo off and only undo that in
/// [`restore_echo`](Terminal::restore_echo). [`close`](Terminal::close) must
/// be idempotent and must leave echo as it was found.
pub trait Terminal {
    /// One unit of input: a byte on POSIX, a UTF-16 code unit on the
    /// Windows console.
    type Unit: Copy + Default + PartialEq + Zeroize;

    /// The unit that ends a line.
    const LINE_END: Self::Unit;

    /// Writes `text` to the terminal and flushes it.
    fn write_prompt(&mut self, text: &str) -> Result<()>;

    fn disable_echo(&mut self) -> Result<()>;

    fn restore_echo(&mut self) -> Result<()>;

    /// Blocks for one unit. `Ok(None)` is end of input.
    fn read_char(&mut self) -> Result<Option<Self::Unit>>;

    fn close(&mut self);
}

/// Closes the wrapped terminal when dropped, whichever way the scope is left.
pub(crate) struct Session<'a, T: Terminal> {
    terminal: &'a mut T,
}

impl<'a, T: Terminal> Session<'a, T> {
    pub(crate) fn new(terminal: &'a mut T) -> Self {
        Self { terminal }
    }

    pub(crate) fn terminal(&mut self) -> &mut T {
        self.terminal
    }
}

impl<T: Terminal> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.terminal.close();
    }
}

/// A terminal backed by an arbitrary byte source.
///
/// Echo is simulated: the flag starts in the state given at construction
/// and follows the same switch-only-if-on rules as a real terminal. Every
/// prompt written is kept so it can be inspected afterwards.
pub struct ReaderTerminal<R: Read> {
    reader: R,
    echo: bool,
    echo_switched: bool,
    fail_disable: bool,
    fail_restore: bool,
    open: bool,
    closes: usize,
    transcript: String,
}

impl<R: Read> ReaderTerminal<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            echo: true,
            echo_switched: false,
            fail_disable: false,
            fail_restore: false,
            open: true,
            closes: 0,
            transcript: String::new(),
        }
    }

    /// Sets the echo state the terminal starts with.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Makes every attempt to switch echo off fail.
    pub fn failing_disable(mut self) -> Self {
        self.fail_disable = true;
        self
    }

    /// Makes every attempt to switch echo back on fail.
    pub fn failing_restore(mut self) -> Self {
        self.fail_restore = true;
        self
    }

    pub fn echo_enabled(&self) -> bool {
        self.echo
    }

    /// Number of times the session went from open to closed.
    pub fn close_count(&self) -> usize {
        self.closes
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Everything written to the terminal so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

impl<R: Read> Terminal for ReaderTerminal<R> {
    type Unit = u8;

    const LINE_END: u8 = b'\n';

    fn write_prompt(&mut self, text: &str) -> Result<()> {
        self.transcript.push_str(text);
        Ok(())
    }

    fn disable_echo(&mut self) -> Result<()> {
        if !self.echo {
            return Ok(());
        }
        if self.fail_disable {
            return Err(PassphraseError::new(
                ErrorKind::TerminalState,
                "simulated failure switching echo off",
            ));
        }
        self.echo = false;
        self.echo_switched = true;
        Ok(())
    }

    fn restore_echo(&mut self) -> Result<()> {
        if !self.echo_switched {
            return Ok(());
        }
        if self.fail_restore {
            return Err(PassphraseError::new(
                ErrorKind::TerminalState,
                "simulated failure switching echo on",
            ));
        }
        self.echo = true;
        self.echo_switched = false;
        Ok(())
    }

    fn read_char(&mut self) -> Result<Option<u8>> {
        if !self.open {
            return Ok(None);
        }
        let mut unit = [0u8; 1];
        loop {
            match self.reader.read(&mut unit) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let byte = unit[0];
                    unit.zeroize();
                    return Ok(Some(byte));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(PassphraseError::with_source(
                        ErrorKind::UnexpectedEndOfInput,
                        format!("failed to read input: {}", e),
                        e,
                    ));
                }
            }
        }
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        if self.echo_switched && !self.fail_restore {
            self.echo = true;
            self.echo_switched = false;
        }
        self.open = false;
        self.closes += 1;
        debug!("in-memory terminal closed");
    }
}
