//! Strike selection around the money.

use super::instrument::OptionInstrument;
use crate::error::{Error, Result};
use rust_decimal::Decimal;

/// Selects a window of strikes around `atm`.
///
/// `strikes` must be sorted ascending without duplicates. The centre is the
/// insertion point of `atm` (the first strike not below it, so an exact match
/// is its own centre), and the window spans `radius` strikes on each side of
/// it, clipped to the slice bounds. Empty only when `strikes` is empty.
///
/// # Example
///
/// ```rust
/// use option_chain_greeks::chain::select_window;
///
/// let strikes = [100, 150, 200, 250, 300, 350, 400];
/// assert_eq!(select_window(&strikes, 225, 2), &[150, 200, 250, 300, 350]);
/// assert_eq!(select_window(&strikes, 100, 2), &[100, 150, 200]);
/// ```
#[must_use]
pub fn select_window<T: PartialOrd>(strikes: &[T], atm: T, radius: usize) -> &[T] {
    let center = strikes
        .partition_point(|strike| *strike < atm)
        .min(strikes.len().saturating_sub(1));
    let start = center.saturating_sub(radius);
    let end = center.saturating_add(radius).saturating_add(1).min(strikes.len());
    &strikes[start.min(end)..end]
}

/// Returns the distinct strikes of `instruments`, sorted ascending.
#[must_use]
pub fn unique_strikes(instruments: &[OptionInstrument]) -> Vec<Decimal> {
    let mut strikes: Vec<Decimal> = instruments.iter().map(|i| i.strike).collect();
    strikes.sort_unstable();
    strikes.dedup();
    strikes
}

/// Returns the strike closest to `spot`; the lower strike wins a tie.
///
/// # Errors
///
/// Returns `Error::NoDataAvailable` if there are no strikes.
pub fn atm_strike(strikes: &[Decimal], spot: Decimal) -> Result<Decimal> {
    strikes
        .iter()
        .copied()
        .min_by_key(|&k| (k - spot).abs())
        .ok_or_else(|| Error::no_data("no strikes available"))
}
