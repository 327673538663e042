//! # Fixed-Width Text Layout
//!
//! Pure functions that fit strings into a grid of `width` characters. Both
//! the printed receipt and the on-screen preview are built from these, so the
//! two stay aligned column for column.
//!
//! Lengths are counted in `char`s. The printer's character set is single-byte,
//! so one `char` occupies exactly one column once the text has been
//! sanitized to Latin-1.

/// Currency prefix used for every amount on a receipt.
pub const CURRENCY: &str = "Rp";

/// Center `text` by left-padding it with spaces.
///
/// The pad is `floor((width - len) / 2)`. Text that is as wide as or wider
/// than `width` is returned unchanged; it is never truncated.
///
/// ```
/// use struk::layout::center;
///
/// assert_eq!(center("TOKO", 10), "   TOKO");
/// assert_eq!(center("TOO WIDE", 4), "TOO WIDE");
/// ```
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let pad = width.saturating_sub(len) / 2;
    if pad > 0 {
        format!("{}{}", " ".repeat(pad), text)
    } else {
        text.to_string()
    }
}

/// Put `left` and `right` on one line, flush to opposite edges of `width`.
///
/// When both fit with at least one space between them, the gap is filled so
/// the line is exactly `width` long. Otherwise `left` is cut to
/// `width - len(right) - 1` characters and a single space separates the two.
/// `right` is never cut, so a right side wider than the line still overflows.
///
/// ```
/// use struk::layout::pair_columns;
///
/// assert_eq!(pair_columns("TOTAL", "Rp9", 12), "TOTAL    Rp9");
/// assert_eq!(pair_columns("LONG LABEL", "Rp1.000", 12), "LONG Rp1.000");
/// ```
pub fn pair_columns(left: &str, right: &str, width: usize) -> String {
    let (left, right) = pair_columns_split(left, right, width);
    left + right
}

/// Same layout as [`pair_columns`], returned as the padded left part and the
/// untouched right part so each half can carry its own style.
pub fn pair_columns_split<'a>(left: &str, right: &'a str, width: usize) -> (String, &'a str) {
    let left_len = left.chars().count();
    let right_len = right.chars().count();

    if left_len + right_len < width {
        let gap = width - left_len - right_len;
        (format!("{}{}", left, " ".repeat(gap)), right)
    } else {
        let keep = width.saturating_sub(right_len + 1);
        let mut head: String = left.chars().take(keep).collect();
        head.push(' ');
        (head, right)
    }
}

/// Cut `text` to `width` characters, marking the cut with `...`.
///
/// The result is never longer than `width`. Widths below 3 leave no room for
/// any text, so only as many dots as fit are returned.
///
/// ```
/// use struk::layout::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("KOPI KAPAL API SACHET", 10), "KOPI KA...");
/// assert_eq!(truncate_with_ellipsis("AQUA", 10), "AQUA");
/// ```
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    const ELLIPSIS: &str = "...";

    if text.chars().count() <= width {
        return text.to_string();
    }
    if width < ELLIPSIS.len() {
        return ".".repeat(width);
    }
    let mut out: String = text.chars().take(width - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// A full-width rule of `ch`.
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}

/// Group an integer in thousands with `.` as separator.
///
/// ```
/// use struk::layout::format_thousands;
///
/// assert_eq!(format_thousands(30000), "30.000");
/// assert_eq!(format_thousands(-1250), "-1.250");
/// ```
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(digit);
    }
    out
}

/// Format an amount as rupiah: `Rp` directly followed by the grouped number.
///
/// ```
/// use struk::layout::format_rupiah;
///
/// assert_eq!(format_rupiah(10500), "Rp10.500");
/// ```
pub fn format_rupiah(value: i64) -> String {
    format!("{}{}", CURRENCY, format_thousands(value))
}
