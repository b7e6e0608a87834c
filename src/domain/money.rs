use std::fmt;

/// Monetary values are integer cents to avoid floating-point drift.
/// The storage schema's decimal(15,2) fits comfortably: 10^15 units
/// is 10^17 cents, within i64 range.
pub type Cents = i64;

/// Format cents as a decimal string with two fractional digits.
/// Example: 125000 -> "1250.00", -1 -> "-0.01"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "1250.00" -> 125000, "12.5" -> 1250, "100" -> 10000
///
/// More than two fractional digits is an error: amounts are settled to
/// the cent and sub-cent input is rejected rather than truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let (units_str, fraction_str) = match input.split_once('.') {
        None => (input, ""),
        Some((units, fraction)) => {
            if fraction.contains('.') {
                return Err(ParseCentsError::InvalidFormat);
            }
            (units, fraction)
        }
    };

    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let fraction: i64 = match fraction_str.len() {
        0 => 0,
        1 => {
            // "12.5" means 50 cents
            fraction_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        2 => fraction_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
        _ => return Err(ParseCentsError::SubCentPrecision),
    };

    let cents = units * 100 + fraction;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    SubCentPrecision,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::SubCentPrecision => {
                write!(f, "amounts are settled to the cent, at most 2 decimal places")
            }
        }
    }
}

impl std::error::Error for ParseCentsError {}
