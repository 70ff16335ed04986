//! Smallest-unit to display-unit conversion.
//!
//! Balances arrive as integer strings in the chain's smallest unit (wei for
//! 18-decimal currencies) and can exceed any fixed-width integer, so the
//! conversion works on the decimal digits directly. No floats anywhere:
//! `0.1 + 0.2` has no business near a balance.

/// Errors from [`format_units`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,

    #[error("amount {0:?} is not a non-negative integer")]
    InvalidDigit(String),
}

/// Converts `raw` (an integer in the smallest unit) to a decimal string with
/// exactly `fraction_digits` fractional digits, rounding half up.
///
/// ```
/// use walletforge_session::format_units;
///
/// assert_eq!(format_units("2500000000000000000", 18, 4).unwrap(), "2.5000");
/// ```
pub fn format_units(raw: &str, decimals: u8, fraction_digits: usize) -> Result<String, UnitsError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UnitsError::Empty);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::InvalidDigit(raw.to_string()));
    }

    let decimals = usize::from(decimals);
    let trimmed = raw.trim_start_matches('0');

    // Left-pad so there is at least one integer digit.
    let mut digits: Vec<u8> = vec![b'0'; (decimals + 1).saturating_sub(trimmed.len())];
    digits.extend_from_slice(trimmed.as_bytes());

    let int_len = digits.len() - decimals;
    let kept_len = int_len + fraction_digits.min(decimals);
    let round_up = digits.get(kept_len).is_some_and(|d| *d >= b'5');
    digits.truncate(kept_len);
    let mut int_len = int_len;
    if round_up && increment(&mut digits) {
        int_len += 1;
    }

    // Right-pad the fraction when the currency has fewer decimals than we
    // display.
    digits.resize(int_len + fraction_digits, b'0');

    let (int_part, frac_part) = digits.split_at(int_len);
    let int_part = String::from_utf8_lossy(int_part);
    if fraction_digits == 0 {
        return Ok(int_part.into_owned());
    }
    Ok(format!("{int_part}.{}", String::from_utf8_lossy(frac_part)))
}

/// Adds one to a big-endian ASCII digit string in place.
///
/// Returns `true` if the carry produced a new leading digit.
fn increment(digits: &mut Vec<u8>) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return false;
        }
    }
    digits.insert(0, b'1');
    true
}

/// Returns `true` for a non-negative decimal such as `"12"` or `"0.5000"`.
///
/// A fractional part, when present, needs digits on both sides of the dot.
pub fn is_decimal(value: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match value.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(value),
    }
}
