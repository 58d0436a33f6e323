//! Utility functions for the option-chain-greeks library.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Upstream expiry format, e.g. `24FEB2026`.
const EXPIRY_FORMAT: &str = "%d%b%Y";

/// Calendar days per year used for time to expiry.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Parses an upstream expiry string in `DDMMMYYYY` format.
///
/// Month abbreviations are matched case-insensitively.
///
/// # Errors
///
/// Returns `Error::InvalidExpiry` if the string is not a valid date.
///
/// # Examples
///
/// ```rust
/// use option_chain_greeks::utils::parse_expiry;
/// use chrono::NaiveDate;
///
/// let date = parse_expiry("24FEB2026").unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 24).unwrap());
/// ```
pub fn parse_expiry(expiry: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(expiry.trim(), EXPIRY_FORMAT)
        .map_err(|_| Error::InvalidExpiry(expiry.to_string()))
}

/// Formats a date in the upstream `DDMMMYYYY` format (e.g. "24FEB2026").
#[must_use]
pub fn format_expiry(expiry: NaiveDate) -> String {
    expiry.format(EXPIRY_FORMAT).to_string().to_uppercase()
}

/// Returns the time to expiry in years as calendar days / 365.
///
/// On or after expiry day the result is one day, so that expiry-day chains
/// can still be priced.
#[must_use]
pub fn time_to_expiry(expiry: NaiveDate, today: NaiveDate) -> f64 {
    let days = (expiry - today).num_days();
    if days <= 0 {
        return 1.0 / DAYS_PER_YEAR;
    }
    days as f64 / DAYS_PER_YEAR
}

/// Rounds a float to `dp` decimal places as a [`Decimal`].
///
/// Non-finite or unrepresentable values become zero.
#[must_use]
pub fn round_decimal(value: f64, dp: u32) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp).normalize())
        .unwrap_or(Decimal::ZERO)
}
