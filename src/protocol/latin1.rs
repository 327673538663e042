//! # Latin-1 Encoding
//!
//! Converts Unicode strings to the single-byte character set the printer
//! renders (ISO-8859-1). Code points U+0000–U+00FF map to the byte of the
//! same value; anything above has no representation on the device.
//!
//! Two entry points:
//!
//! - [`encode`] is strict and reports the first unrepresentable character.
//!   The command encoder uses it, so bad text never reaches the wire.
//! - [`sanitize`] is lossy and replaces unrepresentable characters with `?`.
//!   It also neutralizes control characters, which the strict path lets
//!   through as opcode bytes. Receipt rendering runs collaborator-supplied
//!   text through it first.

use std::borrow::Cow;

use tracing::debug;

use crate::error::EncodeError;

/// Replacement for characters the printer cannot render
pub const REPLACEMENT: char = '?';

/// Encode a string as Latin-1 bytes.
///
/// ## Example
///
/// ```
/// use struk::protocol::latin1;
///
/// assert_eq!(latin1::encode("Café").unwrap(), vec![b'C', b'a', b'f', 0xE9]);
/// assert!(latin1::encode("5€").is_err());
/// ```
pub fn encode(s: &str) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(s.len());
    for (position, ch) in s.chars().enumerate() {
        match to_latin1(ch) {
            Some(byte) => out.push(byte),
            None => return Err(EncodeError::Unrepresentable { ch, position }),
        }
    }
    Ok(out)
}

/// Whether every character of `s` prints as itself: representable and not
/// a C0/C1 control.
pub fn is_printable(s: &str) -> bool {
    s.chars().all(is_printable_char)
}

/// Replace characters that would not print as themselves.
///
/// Tabs and line breaks become spaces so a field stays on one line; other
/// controls and unrepresentable characters become `?`. The character count
/// is unchanged. Borrows when the input is already printable.
///
/// ```
/// use struk::protocol::latin1::sanitize;
///
/// assert_eq!(sanitize("Kopi ☕"), "Kopi ?");
/// assert_eq!(sanitize("A\nB\x1dV\x00"), "A B?V?");
/// ```
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if is_printable(s) {
        return Cow::Borrowed(s);
    }
    let cleaned = s
        .chars()
        .map(|ch| match ch {
            _ if is_printable_char(ch) => ch,
            '\t' | '\n' | '\r' => ' ',
            _ => {
                debug!(
                    "latin1: unprintable character U+{:04X}, replacing with '?'",
                    ch as u32
                );
                REPLACEMENT
            }
        })
        .collect();
    Cow::Owned(cleaned)
}

#[inline]
fn is_printable_char(ch: char) -> bool {
    !ch.is_control() && to_latin1(ch).is_some()
}

#[inline]
fn to_latin1(ch: char) -> Option<u8> {
    u8::try_from(u32::from(ch)).ok()
}
