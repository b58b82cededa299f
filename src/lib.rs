//! ttypass - echo-free password entry from the controlling terminal
//!
//! Reads a password (twice when it protects new data), wipes every copy it
//! made, and hands it back as UTF-16LE ready for key derivation.

pub mod error;
pub mod passphrase;
pub mod secret;
pub mod terminal;
pub mod transcode;

pub use error::{EncodingFailure, ErrorCategory, ErrorKind, PassphraseError, Result, error_message};
pub use passphrase::{Mode, PasswordReader, Prompts};

/// Longest accepted password, in input units.
///
/// Part of the key-derivation input contract: changing it changes which
/// passwords can open existing files.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Output buffer size that fits any accepted password as UTF-16LE.
pub const ENCODED_CAPACITY: usize = 2 * MAX_PASSWORD_LEN;

/// Reads a password from the controlling terminal into `out` as UTF-16LE.
///
/// Uses the platform terminal and transcoder: `/dev/tty` with locale
/// conversion (or the Latin-1 fallback without the `iconv` feature) on
/// Unix, the console with native UTF-16 on Windows. Returns the number of
/// bytes written to `out`.
#[cfg(any(unix, windows))]
pub fn read_password(mode: Mode, out: &mut [u8]) -> Result<usize> {
    let mut terminal = terminal::PlatformTerminal::open()?;
    PasswordReader::new(transcode::platform_transcoder()).read(&mut terminal, mode, out)
}

/// [`read_password`] for integer-only callers: the byte count, or the
/// negative [`ErrorKind::code`] on failure. [`error_message`] turns the
/// code back into text.
#[cfg(any(unix, windows))]
pub fn read_password_code(mode: Mode, out: &mut [u8]) -> i32 {
    match read_password(mode, out) {
        Ok(len) => len as i32,
        Err(err) => err.code(),
    }
}
