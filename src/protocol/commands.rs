//! # ESC/POS Commands
//!
//! This module implements the command subset understood by the small 58mm and
//! 80mm Bluetooth receipt printers sold for market stalls and shops (the
//! "POS-5802" class of devices).
//!
//! ## Protocol Overview
//!
//! Commands are short byte sequences starting with an escape byte, interleaved
//! with plain text in a single-byte character set. Each function here returns
//! the exact bytes for one command; [`super::encoder::CommandEncoder`] chains
//! them together.
//!
//! | Operation | Bytes |
//! |---|---|
//! | Initialize | `1B 40` |
//! | Character spacing n | `1B 20 n` |
//! | Select font | `1B 4D n` (0 or 1) |
//! | Print density | `12 23 n` |
//! | Align left/center/right | `1B 61 00` / `1B 61 01` / `1B 61 02` |
//! | Bold on/off | `1B 45 01` / `1B 45 00` |
//! | Double size on/off | `1B 21 30` / `1B 21 00` |
//! | Line spacing n / reset | `1B 33 n` / `1B 32` |
//! | Newline | `0A` |
//! | Cut partial/full | `1D 56 01` / `1D 56 00` |
//!
//! These bytes are the wire contract with the printer and must not change.

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Prefix for the cutter command
pub const GS: u8 = 0x1D;

/// DC2 (Device Control 2) - Prefix for the density command
pub const DC2: u8 = 0x12;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

/// Character spacing written by [`super::encoder::CommandEncoder::init`]
pub const DEFAULT_CHAR_SPACING: u8 = 1;

/// Print mode byte for double width + double height (`ESC ! n`)
const MODE_DOUBLE_SIZE: u8 = 0x30;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on defaults: clears the line buffer,
/// turns off bold and double size, resets alignment and line spacing.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## Example
///
/// ```
/// use struk::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

// ============================================================================
// CHARACTER SETTINGS
// ============================================================================

/// # Set Right-Side Character Spacing (ESC SP n)
///
/// Adds `n` dots of space to the right of every character.
///
/// | Format  | Bytes     |
/// |---------|-----------|
/// | ASCII   | ESC SP n  |
/// | Hex     | 1B 20 n   |
#[inline]
pub fn character_spacing(dots: u8) -> Vec<u8> {
    vec![ESC, b' ', dots]
}

/// # Select Character Font (ESC M n)
///
/// `false` selects the standard 12×24 font, `true` the condensed 9×17 font.
///
/// | Format  | Bytes     |
/// |---------|-----------|
/// | ASCII   | ESC M n   |
/// | Hex     | 1B 4D n   |
#[inline]
pub fn select_font(alternate: bool) -> Vec<u8> {
    vec![ESC, b'M', alternate as u8]
}

/// # Set Print Density (DC2 # n)
///
/// Packs heating time and break time into one parameter byte:
///
/// ```text
///  bit  7 6 5 | 4 3 2 1 0
///       break | heating
/// ```
///
/// Only the low 3 bits of `break_time` and the low 5 bits of `heating` are
/// used; higher bits are discarded.
///
/// ## Example
///
/// ```
/// use struk::protocol::commands;
///
/// assert_eq!(commands::print_density(15, 2), vec![0x12, 0x23, 0x4F]);
/// ```
#[inline]
pub fn print_density(heating: u8, break_time: u8) -> Vec<u8> {
    let n = ((break_time & 0x07) << 5) | (heating & 0x1F);
    vec![DC2, b'#', n]
}

// ============================================================================
// ALIGNMENT AND STYLE
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Set Justification (ESC a n)
///
/// | Format  | Bytes     |
/// |---------|-----------|
/// | ASCII   | ESC a n   |
/// | Hex     | 1B 61 n   |
///
/// Takes effect at the start of the next line.
#[inline]
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// # Emphasized Mode (ESC E n)
///
/// | Bold | Bytes      |
/// |------|------------|
/// | on   | 1B 45 01   |
/// | off  | 1B 45 00   |
#[inline]
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, b'E', on as u8]
}

/// # Select Print Mode (ESC ! n)
///
/// Double size sets both the double-height and double-width bits (`0x30`).
/// Turning it off writes mode `0x00`, which also clears any other mode bits.
#[inline]
pub fn double_size(on: bool) -> Vec<u8> {
    vec![ESC, b'!', if on { MODE_DOUBLE_SIZE } else { 0x00 }]
}

// ============================================================================
// LINE SPACING AND PAPER CONTROL
// ============================================================================

/// # Set Line Spacing (ESC 3 n)
///
/// Sets the distance between lines to `n` dots.
#[inline]
pub fn line_spacing(dots: u8) -> Vec<u8> {
    vec![ESC, b'3', dots]
}

/// # Default Line Spacing (ESC 2)
#[inline]
pub fn reset_line_spacing() -> Vec<u8> {
    vec![ESC, b'2']
}

/// # Line Feed (LF)
#[inline]
pub fn newline() -> Vec<u8> {
    vec![LF]
}

/// # Cut Paper (GS V m)
///
/// | Cut     | Bytes     |
/// |---------|-----------|
/// | partial | 1D 56 01  |
/// | full    | 1D 56 00  |
///
/// A partial cut leaves a small hinge so the receipt does not fall off.
#[inline]
pub fn cut(partial: bool) -> Vec<u8> {
    vec![GS, b'V', partial as u8]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_character_spacing() {
        assert_eq!(character_spacing(0), vec![0x1B, 0x20, 0x00]);
        assert_eq!(character_spacing(DEFAULT_CHAR_SPACING), vec![0x1B, 0x20, 0x01]);
    }

    #[test]
    fn test_select_font() {
        assert_eq!(select_font(false), vec![0x1B, 0x4D, 0x00]);
        assert_eq!(select_font(true), vec![0x1B, 0x4D, 0x01]);
    }

    #[test]
    fn test_print_density_packing() {
        assert_eq!(print_density(0, 0), vec![0x12, 0x23, 0x00]);
        assert_eq!(print_density(0x1F, 7), vec![0x12, 0x23, 0xFF]);
        assert_eq!(print_density(7, 2), vec![0x12, 0x23, 0x47]);
    }

    #[test]
    fn test_print_density_masks_out_of_range() {
        // heating 0x25 -> 0x05, break 9 -> 1
        assert_eq!(print_density(0x25, 9), vec![0x12, 0x23, 0x25]);
    }

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold(true), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_double_size() {
        assert_eq!(double_size(true), vec![0x1B, 0x21, 0x30]);
        assert_eq!(double_size(false), vec![0x1B, 0x21, 0x00]);
    }

    #[test]
    fn test_line_spacing() {
        assert_eq!(line_spacing(32), vec![0x1B, 0x33, 0x20]);
        assert_eq!(reset_line_spacing(), vec![0x1B, 0x32]);
    }

    #[test]
    fn test_newline_and_cut() {
        assert_eq!(newline(), vec![0x0A]);
        assert_eq!(cut(true), vec![0x1D, 0x56, 0x01]);
        assert_eq!(cut(false), vec![0x1D, 0x56, 0x00]);
    }
}
