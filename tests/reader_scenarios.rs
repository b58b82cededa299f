//! Password reader scenarios driven through an in-memory terminal

use proptest::prelude::*;
use ttypass::terminal::ReaderTerminal;
use ttypass::transcode::Latin1Transcoder;
use ttypass::{
    ENCODED_CAPACITY, EncodingFailure, ErrorKind, MAX_PASSWORD_LEN, Mode, PasswordReader,
    error_message,
};

fn read(input: &[u8], mode: Mode, out: &mut [u8]) -> (ttypass::Result<usize>, bool, usize) {
    let mut term = ReaderTerminal::new(input);
    let result = PasswordReader::new(Latin1Transcoder).read(&mut term, mode, out);
    (result, term.echo_enabled(), term.close_count())
}

fn decode(encoded: &[u8]) -> Vec<u16> {
    encoded
        .chunks_exact(2)
        .map(|p| u16::from_le_bytes([p[0], p[1]]))
        .collect()
}

fn line() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("no newline", |b| *b != b'\n'), 0..64)
}

#[test]
fn test_decrypt_correct_horse() {
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, echo, closes) = read(b"correct horse\n", Mode::Decrypt, &mut out);
    let n = result.unwrap();
    assert_eq!(n, 26);
    assert_eq!(
        String::from_utf16(&decode(&out[..n])).unwrap(),
        "correct horse"
    );
    assert!(echo);
    assert_eq!(closes, 1);
}

#[test]
fn test_encrypt_abc_abd_mismatch() {
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, echo, closes) = read(b"abc\nabd\n", Mode::Encrypt, &mut out);
    let err = result.expect_err("expected mismatch");
    assert_eq!(err.kind, ErrorKind::PasswordMismatch);
    assert_eq!(error_message(err.code()), "passwords don't match");
    assert!(echo);
    assert_eq!(closes, 1);
}

#[test]
fn test_encrypt_both_empty() {
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, _, _) = read(b"\n\n", Mode::Encrypt, &mut out);
    assert_eq!(result.unwrap(), 0);
}

#[test]
fn test_decrypt_empty_line() {
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, _, _) = read(b"\n", Mode::Decrypt, &mut out);
    assert_eq!(result.unwrap(), 0);
}

#[test]
fn test_empty_then_nonempty_mismatch() {
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, _, _) = read(b"\nx\n", Mode::Encrypt, &mut out);
    let err = result.expect_err("expected mismatch");
    assert_eq!(err.kind, ErrorKind::PasswordMismatch);
}

#[test]
fn test_one_past_max_is_too_long() {
    let mut input = vec![b'a'; MAX_PASSWORD_LEN + 1];
    input.push(b'\n');
    let mut out = [0u8; ENCODED_CAPACITY];
    let (result, echo, closes) = read(&input, Mode::Decrypt, &mut out);
    let err = result.expect_err("expected too long");
    assert_eq!(err.kind, ErrorKind::PasswordTooLong);
    assert!(echo);
    assert_eq!(closes, 1);
}

#[test]
fn test_small_output_buffer() {
    let mut out = [0u8; 8];
    let (result, _, _) = read(b"longer than four\n", Mode::Decrypt, &mut out);
    let err = result.expect_err("expected oversize");
    assert_eq!(err.kind, ErrorKind::Encoding(EncodingFailure::Oversize));
    assert!(out.iter().all(|&b| b == 0));
}

#[cfg(all(feature = "iconv", target_os = "linux", target_env = "gnu"))]
#[test]
fn test_utf8_locale_round_trip() {
    use ttypass::transcode::IconvTranscoder;

    let transcoder = IconvTranscoder::with_codeset("UTF-8").unwrap();
    let mut term = ReaderTerminal::new("grüße 🔐\n".as_bytes());
    let mut out = [0u8; ENCODED_CAPACITY];
    let n = PasswordReader::new(transcoder)
        .read(&mut term, Mode::Decrypt, &mut out)
        .unwrap();
    assert_eq!(String::from_utf16(&decode(&out[..n])).unwrap(), "grüße 🔐");
}

proptest! {
    #[test]
    fn prop_decrypt_round_trips(pw in line()) {
        let mut input = pw.clone();
        input.push(b'\n');
        let mut out = [0u8; ENCODED_CAPACITY];
        let (result, echo, closes) = read(&input, Mode::Decrypt, &mut out);
        let n = result.unwrap();
        prop_assert_eq!(n, 2 * pw.len());
        let expected: Vec<u16> = pw.iter().map(|&b| u16::from(b)).collect();
        prop_assert_eq!(decode(&out[..n]), expected);
        prop_assert!(echo);
        prop_assert_eq!(closes, 1);
    }

    #[test]
    fn prop_encrypt_matches_iff_equal(first in line(), second in line()) {
        let mut input = first.clone();
        input.push(b'\n');
        input.extend_from_slice(&second);
        input.push(b'\n');
        let mut out = [0xEEu8; ENCODED_CAPACITY];
        let (result, echo, closes) = read(&input, Mode::Encrypt, &mut out);
        if first == second {
            prop_assert_eq!(result.unwrap(), 2 * first.len());
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.kind, ErrorKind::PasswordMismatch);
            prop_assert!(out.iter().all(|&b| b == 0xEE));
        }
        prop_assert!(echo);
        prop_assert_eq!(closes, 1);
    }

    #[test]
    fn prop_missing_terminator_is_end_of_input(pw in line(), encrypt in any::<bool>()) {
        let mode = if encrypt { Mode::Encrypt } else { Mode::Decrypt };
        let mut out = [0u8; ENCODED_CAPACITY];
        let (result, echo, _) = read(&pw, mode, &mut out);
        let err = result.unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::UnexpectedEndOfInput);
        prop_assert!(echo);
    }

    #[test]
    fn prop_overlong_rejected(extra in 1usize..64) {
        let mut input = vec![b'z'; MAX_PASSWORD_LEN + extra];
        input.push(b'\n');
        let mut out = [0u8; ENCODED_CAPACITY];
        let (result, echo, _) = read(&input, Mode::Decrypt, &mut out);
        prop_assert_eq!(result.unwrap_err().kind, ErrorKind::PasswordTooLong);
        prop_assert!(echo);
    }
}

#[cfg(all(feature = "iconv", target_os = "linux", target_env = "gnu"))]
proptest! {
    #[test]
    fn prop_utf8_locale_round_trips(pw in "[^\n]{0,200}") {
        use ttypass::transcode::IconvTranscoder;

        let transcoder = IconvTranscoder::with_codeset("UTF-8").unwrap();
        let mut input = pw.clone().into_bytes();
        input.push(b'\n');
        prop_assume!(input.len() <= MAX_PASSWORD_LEN + 1);
        let mut term = ReaderTerminal::new(&input[..]);
        let mut out = [0u8; ENCODED_CAPACITY];
        let n = PasswordReader::new(transcoder)
            .read(&mut term, Mode::Decrypt, &mut out)
            .unwrap();
        prop_assert_eq!(n, 2 * pw.encode_utf16().count());
        prop_assert_eq!(String::from_utf16(&decode(&out[..n])).unwrap(), pw);
        prop_assert!(term.echo_enabled());
    }
}
