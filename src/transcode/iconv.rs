//! Locale-aware conversion through glibc's iconv

use std::ffi::{CStr, CString};
use std::io;
use std::ptr;

use libc::{c_char, size_t};
use tracing::debug;
use zeroize::Zeroize;

use super::{Conversion, Transcoder, check_length};
use crate::error::{EncodingFailure, ErrorKind, PassphraseError, Result};

const TARGET_CODESET: &CStr = c"UTF-16LE";

/// What glibc reports for the "C" locale.
const C_LOCALE_CODESET: &CStr = c"ANSI_X3.4-1968";

/// Converts from a narrow codeset (by default the one named by the
/// environment's locale) to UTF-16LE.
#[derive(Debug, Clone)]
pub struct IconvTranscoder {
    codeset: CString,
}

impl IconvTranscoder {
    /// Uses the codeset of the locale selected by `LC_ALL`, `LC_CTYPE` or
    /// `LANG`. The locale is looked up for this thread only; the process
    /// locale is left alone. Falls back to the C locale's codeset when the
    /// environment names a locale that is not installed.
    pub fn from_locale() -> Self {
        let codeset = environment_codeset();
        debug!(codeset = %codeset.to_string_lossy(), "resolved locale codeset");
        Self { codeset }
    }

    /// Uses `codeset`, e.g. `"UTF-8"` or `"ISO-8859-15"`. Whether iconv
    /// knows it is only found out by the first conversion.
    pub fn with_codeset(codeset: &str) -> Result<Self> {
        let codeset = CString::new(codeset).map_err(|e| {
            PassphraseError::with_source(
                ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset),
                "codeset name contains a NUL byte",
                e,
            )
        })?;
        Ok(Self { codeset })
    }

    pub fn codeset(&self) -> &CStr {
        &self.codeset
    }
}

fn environment_codeset() -> CString {
    // SAFETY: newlocale receives a valid empty C string and a null base;
    // the returned object is only installed for this thread, restored, and
    // freed. nl_langinfo's result is copied before the locale goes away.
    unsafe {
        let locale = libc::newlocale(libc::LC_CTYPE_MASK, c"".as_ptr(), ptr::null_mut());
        if locale.is_null() {
            return C_LOCALE_CODESET.to_owned();
        }
        let previous = libc::uselocale(locale);
        let name = libc::nl_langinfo(libc::CODESET);
        let codeset = if name.is_null() {
            C_LOCALE_CODESET.to_owned()
        } else {
            CStr::from_ptr(name).to_owned()
        };
        libc::uselocale(previous);
        libc::freelocale(locale);
        codeset
    }
}

fn classify(err: io::Error) -> PassphraseError {
    let failure = match err.raw_os_error() {
        Some(libc::E2BIG) => EncodingFailure::Oversize,
        _ => EncodingFailure::InvalidSequence,
    };
    PassphraseError::with_source(
        ErrorKind::Encoding(failure),
        format!("password conversion failed: {}", err),
        err,
    )
}

impl Transcoder for IconvTranscoder {
    type Unit = u8;

    fn transcode(&self, input: &[u8], max_chars: usize, out: &mut [u8]) -> Result<usize> {
        check_length(input.len(), max_chars)?;
        let capacity = max_chars.saturating_mul(2).min(out.len());

        // SAFETY: both arguments are NUL-terminated strings.
        let cd = unsafe { libc::iconv_open(TARGET_CODESET.as_ptr(), self.codeset.as_ptr()) };
        if cd as isize == -1 {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset),
                format!(
                    "iconv_open() cannot convert from {}: {}",
                    self.codeset.to_string_lossy(),
                    e
                ),
                e,
            ));
        }

        let mut in_ptr = input.as_ptr() as *mut c_char;
        let mut in_left: size_t = input.len();
        let mut out_ptr = out.as_mut_ptr() as *mut c_char;
        let mut out_left: size_t = capacity;
        // SAFETY: the pointers and counts describe `input` and the first
        // `capacity` bytes of `out`; iconv never reads or writes past them
        // and never writes through the input pointer.
        let rc = unsafe { libc::iconv(cd, &mut in_ptr, &mut in_left, &mut out_ptr, &mut out_left) };
        let failure = (rc == size_t::MAX).then(io::Error::last_os_error);
        // SAFETY: cd came from a successful iconv_open and is closed once.
        unsafe { libc::iconv_close(cd) };

        let written = capacity - out_left;
        if let Some(err) = failure {
            out[..written].zeroize();
            return Err(classify(err));
        }
        Ok(written)
    }

    fn conversion(&self) -> Conversion {
        Conversion::Locale
    }
}
