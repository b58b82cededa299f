//! `/dev/tty` with termios echo control

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use tracing::{debug, warn};
use zeroize::Zeroize;

use super::Terminal;
use crate::error::{ErrorKind, PassphraseError, Result};

const TTY_PATH: &str = "/dev/tty";

/// The process's controlling terminal, independent of how stdin and stdout
/// are redirected.
///
/// Input is read straight from the descriptor, one byte per `read(2)`, so
/// no password bytes are left behind in a userspace I/O buffer.
pub struct PosixTerminal {
    tty: Option<File>,
    saved: libc::termios,
    echo_switched: bool,
}

impl PosixTerminal {
    pub fn open() -> Result<Self> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(TTY_PATH)
            .map_err(|e| {
                PassphraseError::with_source(
                    ErrorKind::TerminalUnavailable,
                    format!("cannot open {}: {}", TTY_PATH, e),
                    e,
                )
            })?;

        // SAFETY: termios is plain data; tcgetattr fills it in completely
        // on success and the value is discarded on failure.
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(tty.as_raw_fd(), &mut saved) } < 0 {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::TerminalState,
                format!("tcgetattr() failed: {}", e),
                e,
            ));
        }

        debug!(path = TTY_PATH, "terminal opened");
        Ok(Self {
            tty: Some(tty),
            saved,
            echo_switched: false,
        })
    }

    fn tty(&mut self) -> Result<&mut File> {
        self.tty.as_mut().ok_or_else(|| {
            PassphraseError::new(ErrorKind::TerminalUnavailable, "terminal already closed")
        })
    }

    fn set_attrs(&mut self, attrs: &libc::termios) -> Result<()> {
        let fd = self.tty()?.as_raw_fd();
        // SAFETY: fd is an open descriptor owned by self and attrs points to
        // an initialised termios.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, attrs) } < 0 {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::TerminalState,
                format!("tcsetattr() failed: {}", e),
                e,
            ));
        }
        Ok(())
    }
}

impl Terminal for PosixTerminal {
    type Unit = u8;

    const LINE_END: u8 = b'\n';

    fn write_prompt(&mut self, text: &str) -> Result<()> {
        let tty = self.tty()?;
        tty.write_all(text.as_bytes())
            .and_then(|()| tty.flush())
            .map_err(|e| {
                PassphraseError::with_source(
                    ErrorKind::TerminalState,
                    format!("failed to write to terminal: {}", e),
                    e,
                )
            })
    }

    fn disable_echo(&mut self) -> Result<()> {
        if self.saved.c_lflag & libc::ECHO == 0 {
            return Ok(());
        }
        let mut quiet = self.saved;
        quiet.c_lflag &= !libc::ECHO;
        self.set_attrs(&quiet)?;
        self.echo_switched = true;
        debug!("terminal echo disabled");
        Ok(())
    }

    fn restore_echo(&mut self) -> Result<()> {
        if !self.echo_switched {
            return Ok(());
        }
        let saved = self.saved;
        self.set_attrs(&saved)?;
        self.echo_switched = false;
        debug!("terminal echo restored");
        Ok(())
    }

    fn read_char(&mut self) -> Result<Option<u8>> {
        let tty = self.tty()?;
        let mut unit = [0u8; 1];
        loop {
            match tty.read(&mut unit) {
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
                        format!("failed to read from terminal: {}", e),
                        e,
                    ));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.tty.is_none() {
            return;
        }
        if let Err(err) = self.restore_echo() {
            warn!(error = %err, "could not restore terminal echo while closing");
        }
        self.tty = None;
        debug!("terminal closed");
    }
}

impl Drop for PosixTerminal {
    fn drop(&mut self) {
        self.close();
    }
}
