//! # Command Encoder
//!
//! A fluent builder that turns formatting calls into one ordered byte buffer.
//!
//! ```
//! use struk::protocol::encoder::CommandEncoder;
//!
//! let mut enc = CommandEncoder::new(32);
//! enc.init()
//!     .align_center()
//!     .bold(true)
//!     .print_line("WARMA STORE")
//!     .bold(false)
//!     .align_left()
//!     .print_double_column("TOTAL", "Rp30.000")
//!     .feed(3)
//!     .cut(true);
//!
//! let bytes = enc.build()?;
//! assert_eq!(&bytes[..5], &[0x1B, 0x40, 0x1B, 0x20, 0x01]);
//! # Ok::<(), struk::error::EncodeError>(())
//! ```
//!
//! Every method appends a fixed opcode sequence (or text bytes) and returns
//! the builder. Text is encoded strictly as Latin-1: the first character that
//! cannot be represented is remembered, its text is dropped, and [`build`]
//! reports the error instead of returning bytes.
//!
//! [`build`]: CommandEncoder::build

use super::commands::{self, Alignment};
use super::latin1;
use crate::error::EncodeError;
use crate::layout;

/// Ordered, append-only command buffer for one print job.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    buf: Vec<u8>,
    paper_width: usize,
    error: Option<EncodeError>,
}

impl CommandEncoder {
    /// Create an empty encoder for a paper `paper_width` characters wide.
    ///
    /// The width drives [`separator`](Self::separator) and
    /// [`print_double_column`](Self::print_double_column).
    pub fn new(paper_width: usize) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            paper_width,
            error: None,
        }
    }

    /// Characters per line this encoder lays out for.
    pub fn paper_width(&self) -> usize {
        self.paper_width
    }

    /// Number of bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Setup ===

    /// Reset the printer, then set the default 1-dot character spacing.
    pub fn init(&mut self) -> &mut Self {
        self.push(&commands::init());
        self.set_character_spacing(commands::DEFAULT_CHAR_SPACING)
    }

    pub fn set_character_spacing(&mut self, dots: u8) -> &mut Self {
        self.push(&commands::character_spacing(dots))
    }

    /// `true` selects the condensed font.
    pub fn select_font(&mut self, use_alternate: bool) -> &mut Self {
        self.push(&commands::select_font(use_alternate))
    }

    pub fn set_print_density(&mut self, heating: u8, break_time: u8) -> &mut Self {
        self.push(&commands::print_density(heating, break_time))
    }

    // === Alignment and style ===

    pub fn align_left(&mut self) -> &mut Self {
        self.push(&commands::align(Alignment::Left))
    }

    pub fn align_center(&mut self) -> &mut Self {
        self.push(&commands::align(Alignment::Center))
    }

    pub fn align_right(&mut self) -> &mut Self {
        self.push(&commands::align(Alignment::Right))
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.push(&commands::bold(on))
    }

    pub fn double_size(&mut self, on: bool) -> &mut Self {
        self.push(&commands::double_size(on))
    }

    pub fn set_line_spacing(&mut self, dots: u8) -> &mut Self {
        self.push(&commands::line_spacing(dots))
    }

    pub fn reset_line_spacing(&mut self) -> &mut Self {
        self.push(&commands::reset_line_spacing())
    }

    // === Text ===

    /// Append text without a line break.
    pub fn print(&mut self, text: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match latin1::encode(text) {
            Ok(bytes) => self.push(&bytes),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    /// Append text followed by a line feed.
    pub fn print_line(&mut self, text: &str) -> &mut Self {
        self.print(text);
        self.push(&commands::newline())
    }

    /// Print `left` and `right` flush to opposite edges of the paper.
    ///
    /// See [`layout::pair_columns`] for how an over-long pair is fitted.
    pub fn print_double_column(&mut self, left: &str, right: &str) -> &mut Self {
        let line = layout::pair_columns(left, right, self.paper_width);
        self.print_line(&line)
    }

    /// A full-width line of `ch`.
    pub fn separator(&mut self, ch: char) -> &mut Self {
        let line = layout::rule(ch, self.paper_width);
        self.print_line(&line)
    }

    /// A full-width line of `=`.
    pub fn double_separator(&mut self) -> &mut Self {
        self.separator('=')
    }

    // === Paper control ===

    /// Feed `lines` blank lines.
    pub fn feed(&mut self, lines: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + lines, commands::LF);
        self
    }

    pub fn cut(&mut self, partial: bool) -> &mut Self {
        self.push(&commands::cut(partial))
    }

    /// The bytes accumulated so far.
    ///
    /// Calling this repeatedly returns the same content; later calls also
    /// include anything appended in between.
    pub fn build(&self) -> Result<Vec<u8>, EncodeError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.buf.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_init_writes_default_spacing() {
        let mut enc = CommandEncoder::new(32);
        enc.init();
        assert_eq!(enc.build().unwrap(), vec![0x1B, 0x40, 0x1B, 0x20, 0x01]);
    }

    #[test]
    fn test_chain_order() {
        let mut enc = CommandEncoder::new(32);
        enc.align_center().bold(true).print("A").bold(false).align_left();
        assert_eq!(
            enc.build().unwrap(),
            vec![
                0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01, b'A', 0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00
            ]
        );
    }

    #[test]
    fn test_setup_commands() {
        let mut enc = CommandEncoder::new(32);
        enc.set_character_spacing(0)
            .select_font(true)
            .set_print_density(15, 2)
            .set_line_spacing(32)
            .reset_line_spacing();
        assert_eq!(
            enc.build().unwrap(),
            vec![
                0x1B, 0x20, 0x00, 0x1B, 0x4D, 0x01, 0x12, 0x23, 0x4F, 0x1B, 0x33, 0x20, 0x1B,
                0x32
            ]
        );
    }

    #[test]
    fn test_double_size_and_align_right() {
        let mut enc = CommandEncoder::new(32);
        enc.double_size(true).align_right().double_size(false);
        assert_eq!(
            enc.build().unwrap(),
            vec![0x1B, 0x21, 0x30, 0x1B, 0x61, 0x02, 0x1B, 0x21, 0x00]
        );
    }

    #[test]
    fn test_print_line_latin1() {
        let mut enc = CommandEncoder::new(32);
        enc.print_line("Café");
        assert_eq!(enc.build().unwrap(), vec![b'C', b'a', b'f', 0xE9, 0x0A]);
    }

    #[test]
    fn test_double_column_is_one_line() {
        let mut enc = CommandEncoder::new(32);
        enc.print_double_column("TOTAL", "Rp30.000");
        let mut expected = format!("TOTAL{}Rp30.000", " ".repeat(19)).into_bytes();
        expected.push(0x0A);
        assert_eq!(enc.build().unwrap(), expected);
    }

    #[test]
    fn test_separators_use_paper_width() {
        let mut enc = CommandEncoder::new(8);
        enc.separator('-').double_separator();
        assert_eq!(enc.build().unwrap(), b"--------\n========\n".to_vec());
    }

    #[test]
    fn test_feed_and_cut() {
        let mut enc = CommandEncoder::new(32);
        enc.feed(3).cut(true).cut(false);
        assert_eq!(
            enc.build().unwrap(),
            vec![0x0A, 0x0A, 0x0A, 0x1D, 0x56, 0x01, 0x1D, 0x56, 0x00]
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut enc = CommandEncoder::new(32);
        enc.init().print_line("X");
        let first = enc.build().unwrap();
        assert_eq!(enc.build().unwrap(), first);
        enc.feed(1);
        assert_eq!(enc.build().unwrap().len(), first.len() + 1);
    }

    #[test]
    fn test_unprintable_text_fails_build() {
        let mut enc = CommandEncoder::new(32);
        enc.init().print_line("Kopi ☕").print_line("ok");
        let err = enc.build().unwrap_err();
        assert_eq!(err, EncodeError::Unrepresentable { ch: '☕', position: 5 });
    }
}
