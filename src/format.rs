//! Formatting measurement values for SDI-12 data responses.
//!
//! A `<value>` field on the wire is an explicit polarity sign followed by up
//! to seven digits, with an optional decimal point: `+3.14`, `-21.5`,
//! `+1013`. Data responses pack as many values as fit into 35-character
//! (`aM!`) or 75-character (`aC!`, high-volume) lines; a recorder fetches
//! the lines one `aDx!` command at a time.
//!
//! [`format_value`] renders a single field, [`pack_values`] distributes a
//! slice of measurements over response lines.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::consts::VALUE_STR_SIZE;

/// Renders one measurement as an SDI-12 `<value>` field.
///
/// The sign is always explicit and trailing fractional zeros are trimmed.
/// `prec` asks for a number of fractional digits and is reduced as needed
/// to respect `fit_len` (total characters including sign and decimal
/// point; `0` means the full nine-character field). A value whose integral
/// part cannot fit, or a NaN, yields an empty string - there is no valid
/// way to put non-numeric text in a data response.
///
/// ```
/// use sdi12_modem::format::format_value;
/// assert_eq!(format_value(3.14159, 2, 0).as_str(), "+3.14");
/// assert_eq!(format_value(-2.5, 1, 0).as_str(), "-2.5");
/// ```
pub fn format_value(value: f64, prec: u8, fit_len: usize) -> String<VALUE_STR_SIZE> {
    let mut out = String::new();
    if value.is_nan() {
        return out;
    }
    let fit = if fit_len == 0 || fit_len > VALUE_STR_SIZE {
        VALUE_STR_SIZE
    } else {
        fit_len
    };

    let mut int_len = 1usize;
    let mut probe = if value < 0.0 { -value } else { value };
    while probe >= 10.0 {
        probe /= 10.0;
        int_len += 1;
    }
    // The sign and the integral digits are not negotiable.
    if int_len + 1 > fit {
        return out;
    }
    let mut prec = usize::from(prec).min(7);
    if prec > 0 {
        prec = prec.min(fit.saturating_sub(int_len + 2));
    }

    let mut buf: String<24> = String::new();
    if write!(buf, "{value:+.prec$}").is_err() {
        return out;
    }
    let mut rendered = buf.as_str();
    if prec > 0 {
        rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    }
    if out.push_str(rendered).is_err() {
        out.clear();
    }
    out
}

/// Packs measurements into data response lines of at most `LINE` characters.
///
/// Greedy first-fit in measurement order, so a recorder stepping through
/// `aD0!`, `aD1!`, ... sees the values in their original sequence. Values
/// that cannot be rendered (NaN, integral overflow) are skipped. Stops
/// quietly when `N` lines are full; SDI-12 offers no way to report more.
pub fn pack_values<const LINE: usize, const N: usize>(
    values: &[f64],
    prec: u8,
    lines: &mut Vec<String<LINE>, N>,
) {
    lines.clear();
    if lines.push(String::new()).is_err() {
        return;
    }
    let mut current = 0;
    for &value in values {
        let field = format_value(value, prec, 0);
        if field.is_empty() {
            continue;
        }
        if lines[current].len() + field.len() > LINE {
            if lines.push(String::new()).is_err() {
                return;
            }
            current += 1;
        }
        let _ = lines[current].push_str(&field);
    }
}
