use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to the user.
    ///
    /// A missing terminal or a failing `tcsetattr()` is reported as
    /// Internal even though the cause may be how the program was started.
    Internal,

    /// The user typed something that cannot be accepted: too long, not
    /// matching, not representable, or the input was closed.
    User,
}

/// The reason a locale-to-UTF-16LE conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFailure {
    /// The input holds more units than the transcoder's `max_chars` bound.
    TooLong,
    /// The converted text does not fit into the output buffer.
    Oversize,
    /// The input contains a byte sequence that is illegal or incomplete in
    /// the source encoding.
    InvalidSequence,
    /// The conversion library does not know the locale's codeset.
    UnsupportedCodeset,
}

/// Condition tag for every failure of a password acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The controlling terminal could not be opened.
    TerminalUnavailable,
    /// Querying or setting the terminal's echo state failed.
    TerminalState,
    /// The input was closed before a line terminator was read.
    UnexpectedEndOfInput,
    /// More than `MAX_PASSWORD_LEN` input units were typed. Units are
    /// bytes on POSIX, so a multibyte character counts more than once.
    PasswordTooLong,
    /// The confirmation entry differs from the first entry.
    PasswordMismatch,
    /// The password could not be converted to UTF-16LE.
    Encoding(EncodingFailure),
}

/// Returned by [`error_message`] for codes no [`ErrorKind`] maps to.
pub const UNKNOWN_CODE_MESSAGE: &str = "no valid error code specified";

impl ErrorKind {
    /// Negative sentinel handed across the integer boundary.
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::TerminalUnavailable => -1,
            ErrorKind::TerminalState => -2,
            ErrorKind::UnexpectedEndOfInput => -3,
            ErrorKind::PasswordTooLong => -4,
            ErrorKind::PasswordMismatch => -5,
            ErrorKind::Encoding(EncodingFailure::TooLong) => -6,
            ErrorKind::Encoding(EncodingFailure::Oversize) => -7,
            ErrorKind::Encoding(EncodingFailure::InvalidSequence) => -8,
            ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset) => -9,
        }
    }

    pub const fn from_code(code: i32) -> Option<ErrorKind> {
        Some(match code {
            -1 => ErrorKind::TerminalUnavailable,
            -2 => ErrorKind::TerminalState,
            -3 => ErrorKind::UnexpectedEndOfInput,
            -4 => ErrorKind::PasswordTooLong,
            -5 => ErrorKind::PasswordMismatch,
            -6 => ErrorKind::Encoding(EncodingFailure::TooLong),
            -7 => ErrorKind::Encoding(EncodingFailure::Oversize),
            -8 => ErrorKind::Encoding(EncodingFailure::InvalidSequence),
            -9 => ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset),
            _ => return None,
        })
    }

    /// Short human-readable description, independent of any error instance.
    pub const fn description(self) -> &'static str {
        match self {
            ErrorKind::TerminalUnavailable => "cannot open the controlling terminal",
            ErrorKind::TerminalState => "cannot change the terminal echo state",
            ErrorKind::UnexpectedEndOfInput => "input closed before the password was complete",
            ErrorKind::PasswordTooLong => "password too long",
            ErrorKind::PasswordMismatch => "passwords don't match",
            ErrorKind::Encoding(EncodingFailure::TooLong) => "password too long to encode",
            ErrorKind::Encoding(EncodingFailure::Oversize) => {
                "encoded password does not fit the output buffer"
            }
            ErrorKind::Encoding(EncodingFailure::InvalidSequence) => {
                "password is not valid in the current locale encoding"
            }
            ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset) => {
                "the current locale encoding is not supported"
            }
        }
    }

    pub const fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::TerminalUnavailable | ErrorKind::TerminalState => ErrorCategory::Internal,
            ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset) => ErrorCategory::Internal,
            _ => ErrorCategory::User,
        }
    }
}

/// Looks up the description for a negative code returned by
/// [`read_password_code`](crate::read_password_code).
pub fn error_message(code: i32) -> &'static str {
    ErrorKind::from_code(code).map_or(UNKNOWN_CODE_MESSAGE, ErrorKind::description)
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct PassphraseError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Specific condition tag; callers branch on this.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl PassphraseError {
    /// Creates a new error whose category follows from its kind.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category: kind.category(),
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category: kind.category(),
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// The negative boundary code for this error's kind.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

impl From<ErrorKind> for PassphraseError {
    fn from(kind: ErrorKind) -> Self {
        PassphraseError::new(kind, kind.description())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PassphraseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    const ALL_KINDS: [ErrorKind; 9] = [
        ErrorKind::TerminalUnavailable,
        ErrorKind::TerminalState,
        ErrorKind::UnexpectedEndOfInput,
        ErrorKind::PasswordTooLong,
        ErrorKind::PasswordMismatch,
        ErrorKind::Encoding(EncodingFailure::TooLong),
        ErrorKind::Encoding(EncodingFailure::Oversize),
        ErrorKind::Encoding(EncodingFailure::InvalidSequence),
        ErrorKind::Encoding(EncodingFailure::UnsupportedCodeset),
    ];

    #[test]
    fn test_codes_are_negative_and_distinct() {
        let mut seen = Vec::new();
        for kind in ALL_KINDS {
            let code = kind.code();
            assert!(code < 0, "{:?} has non-negative code {}", kind, code);
            assert!(!seen.contains(&code), "duplicate code {}", code);
            seen.push(code);
            assert_eq!(ErrorKind::from_code(code), Some(kind));
        }
    }

    #[test]
    fn test_error_message_lookup() {
        assert_eq!(
            error_message(ErrorKind::PasswordMismatch.code()),
            "passwords don't match"
        );
        assert_eq!(
            error_message(ErrorKind::PasswordTooLong.code()),
            "password too long"
        );
        assert_eq!(error_message(0), UNKNOWN_CODE_MESSAGE);
        assert_eq!(error_message(17), UNKNOWN_CODE_MESSAGE);
        assert_eq!(error_message(-100), UNKNOWN_CODE_MESSAGE);
    }

    #[test]
    fn test_category_follows_kind() {
        let err = PassphraseError::new(ErrorKind::TerminalUnavailable, "no tty");
        assert_eq!(err.category, ErrorCategory::Internal);
        let err = PassphraseError::from(ErrorKind::PasswordMismatch);
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.message(), "passwords don't match");
    }

    #[test]
    fn test_with_context_preserves_kind_and_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such device");
        let err = PassphraseError::with_source(ErrorKind::TerminalUnavailable, "open", io_err)
            .with_context("reading password");
        assert_eq!(err.kind, ErrorKind::TerminalUnavailable);
        assert_eq!(err.message(), "reading password");
        let inner = err.source_error().expect("source kept");
        assert_eq!(inner.to_string(), "open");
        assert_eq!(err.code(), -1);
    }
}
