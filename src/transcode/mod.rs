//! Conversion of a password entry to UTF-16LE
//!
//! Key derivation consumes the password as UTF-16LE no matter which
//! platform it was typed on, so every [`Transcoder`] produces exactly that
//! and reports how many bytes it wrote.
//!
//! | Transcoder          | Input unit | Guarantee                                   |
//! |---------------------|------------|---------------------------------------------|
//! | [`IconvTranscoder`] | `u8`       | any text in the locale's codeset            |
//! | [`Latin1Transcoder`]| `u8`       | only ISO-8859-1; other encodings are wrong  |
//! | [`WideTranscoder`]  | `u16`      | input is already UTF-16                     |

use zeroize::Zeroize;

use crate::error::{EncodingFailure, ErrorKind, PassphraseError, Result};

#[cfg(all(feature = "iconv", target_os = "linux", target_env = "gnu"))]
mod iconv;

#[cfg(all(feature = "iconv", target_os = "linux", target_env = "gnu"))]
pub use iconv::IconvTranscoder;

/// The transcoder matching [`PlatformTerminal`](crate::terminal::PlatformTerminal).
#[cfg(all(unix, feature = "iconv", target_os = "linux", target_env = "gnu"))]
pub type PlatformTranscoder = IconvTranscoder;
#[cfg(all(unix, not(all(feature = "iconv", target_os = "linux", target_env = "gnu"))))]
pub type PlatformTranscoder = Latin1Transcoder;
#[cfg(windows)]
pub type PlatformTranscoder = WideTranscoder;

#[cfg(all(unix, feature = "iconv", target_os = "linux", target_env = "gnu"))]
pub fn platform_transcoder() -> PlatformTranscoder {
    IconvTranscoder::from_locale()
}

#[cfg(all(unix, not(all(feature = "iconv", target_os = "linux", target_env = "gnu"))))]
pub fn platform_transcoder() -> PlatformTranscoder {
    Latin1Transcoder
}

#[cfg(windows)]
pub fn platform_transcoder() -> PlatformTranscoder {
    WideTranscoder
}

/// How faithfully a transcoder maps its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Full conversion from the locale's codeset.
    Locale,
    /// Each byte is taken as a Latin-1 code point. Correct only when the
    /// input really is ISO-8859-1 (or ASCII); UTF-8 input produces a
    /// different key than the full conversion would.
    Latin1,
    /// The input is already UTF-16 and is only serialized.
    Wide,
}

pub trait Transcoder {
    type Unit: Copy + Default + PartialEq + Zeroize;

    /// Encodes `input` as UTF-16LE into `out`, returning the byte count.
    ///
    /// Fails with [`EncodingFailure::TooLong`] before touching `out` when
    /// `input` holds more than `max_chars` units. At most `2 * max_chars`
    /// bytes and never more than `out.len()` bytes are written. On failure
    /// whatever was already written is wiped.
    fn transcode(&self, input: &[Self::Unit], max_chars: usize, out: &mut [u8]) -> Result<usize>;

    fn conversion(&self) -> Conversion;
}

fn check_length(len: usize, max_chars: usize) -> Result<()> {
    if len > max_chars {
        return Err(PassphraseError::new(
            ErrorKind::Encoding(EncodingFailure::TooLong),
            format!("password of {} units exceeds {} characters", len, max_chars),
        ));
    }
    Ok(())
}

fn check_room(needed: usize, max_chars: usize, out: &[u8]) -> Result<()> {
    let room = max_chars.saturating_mul(2).min(out.len());
    if needed > room {
        return Err(PassphraseError::new(
            ErrorKind::Encoding(EncodingFailure::Oversize),
            format!("encoded password needs {} bytes, only {} available", needed, room),
        ));
    }
    Ok(())
}

/// Zero-extends each byte to one UTF-16 code unit.
///
/// This is the narrow fallback used when no locale conversion is built in:
/// it is exact for ISO-8859-1 input only. See [`Conversion::Latin1`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Latin1Transcoder;

impl Transcoder for Latin1Transcoder {
    type Unit = u8;

    fn transcode(&self, input: &[u8], max_chars: usize, out: &mut [u8]) -> Result<usize> {
        check_length(input.len(), max_chars)?;
        let needed = input.len() * 2;
        check_room(needed, max_chars, out)?;
        for (pair, &byte) in out.chunks_exact_mut(2).zip(input) {
            pair[0] = byte;
            pair[1] = 0;
        }
        Ok(needed)
    }

    fn conversion(&self) -> Conversion {
        Conversion::Latin1
    }
}

/// Serializes UTF-16 code units, as delivered by the Windows console, in
/// little-endian order. Unpaired surrogates pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct WideTranscoder;

impl Transcoder for WideTranscoder {
    type Unit = u16;

    fn transcode(&self, input: &[u16], max_chars: usize, out: &mut [u8]) -> Result<usize> {
        check_length(input.len(), max_chars)?;
        let needed = input.len() * 2;
        check_room(needed, max_chars, out)?;
        for (pair, unit) in out.chunks_exact_mut(2).zip(input) {
            pair.copy_from_slice(&unit.to_le_bytes());
        }
        Ok(needed)
    }

    fn conversion(&self) -> Conversion {
        Conversion::Wide
    }
}
