//! Option instruments and the instrument universe.
//!
//! The upstream scrip master lists every tradable contract with its strike
//! in a scaled representation (paise for NSE derivatives, so
//! `"150000.000000"` is a 1500.00 strike). [`ScripRecord::to_instrument`]
//! decodes one record into an [`OptionInstrument`] with a normalized strike.

use crate::error::{Error, Result};
use crate::pricing::OptionStyle;
use crate::utils::parse_expiry;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Decimal places the upstream scales strikes by (paise → rupees).
pub const DEFAULT_STRIKE_SCALE: u32 = 2;

/// One listed option contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionInstrument {
    /// Opaque exchange token.
    pub token: String,
    /// Exchange trading symbol (e.g. "RELIANCE24FEB261500CE").
    pub symbol: String,
    /// Underlying symbol (e.g. "RELIANCE").
    pub underlying: String,
    /// Strike in price units.
    #[serde(with = "rust_decimal::serde::float")]
    pub strike: Decimal,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Call or put.
    pub style: OptionStyle,
    /// Contract lot size, when known.
    pub lot_size: Option<u32>,
}

impl OptionInstrument {
    /// Creates a new instrument.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        symbol: impl Into<String>,
        underlying: impl Into<String>,
        strike: Decimal,
        expiry: NaiveDate,
        style: OptionStyle,
    ) -> Self {
        Self {
            token: token.into(),
            symbol: symbol.into(),
            underlying: underlying.into(),
            strike,
            expiry,
            style,
            lot_size: None,
        }
    }

    /// Sets the lot size.
    #[must_use]
    pub const fn with_lot_size(mut self, lot_size: u32) -> Self {
        self.lot_size = Some(lot_size);
        self
    }
}

/// Converts an upstream scaled strike into price units.
///
/// ```rust
/// use option_chain_greeks::chain::normalize_strike;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(normalize_strike(dec!(150000.000000), 2), dec!(1500));
/// assert_eq!(normalize_strike(dec!(2412550), 2), dec!(24125.50));
/// ```
#[must_use]
pub fn normalize_strike(raw: Decimal, scale: u32) -> Decimal {
    (raw * Decimal::new(1, scale)).normalize()
}

/// Returns the earliest expiry on or after `today`.
#[must_use]
pub fn nearest_expiry(instruments: &[OptionInstrument], today: NaiveDate) -> Option<NaiveDate> {
    instruments
        .iter()
        .map(|i| i.expiry)
        .filter(|&expiry| expiry >= today)
        .min()
}

/// One row of the upstream scrip master JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScripRecord {
    /// Exchange token.
    pub token: String,
    /// Trading symbol.
    pub symbol: String,
    /// Underlying name.
    pub name: String,
    /// Expiry in `DDMMMYYYY`, empty for cash instruments.
    pub expiry: String,
    /// Scaled strike, e.g. `"150000.000000"`.
    pub strike: String,
    /// Lot size as a string.
    pub lotsize: String,
    /// Instrument type (`OPTSTK`, `OPTIDX`, `FUTSTK`, empty for equity).
    pub instrumenttype: String,
    /// Exchange segment (`NSE`, `NFO`, …).
    pub exch_seg: String,
    /// Tick size as a string.
    pub tick_size: String,
}

impl ScripRecord {
    /// Returns true for option contracts (`OPTSTK`, `OPTIDX`, …).
    #[must_use]
    pub fn is_option(&self) -> bool {
        self.instrumenttype.starts_with("OPT")
    }

    /// Decodes this record into an instrument.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInstrument` if the record is not an option or a
    /// field cannot be parsed.
    pub fn to_instrument(&self, strike_scale: u32) -> Result<OptionInstrument> {
        if !self.is_option() {
            return Err(Error::invalid_instrument(
                &self.token,
                format!("not an option: '{}'", self.instrumenttype),
            ));
        }

        let style = OptionStyle::from_symbol(&self.symbol).ok_or_else(|| {
            Error::invalid_instrument(&self.token, format!("no CE/PE suffix in '{}'", self.symbol))
        })?;

        let raw_strike = Decimal::from_str(self.strike.trim()).map_err(|e| {
            Error::invalid_instrument(&self.token, format!("strike '{}': {e}", self.strike))
        })?;
        let strike = normalize_strike(raw_strike, strike_scale);
        if strike <= Decimal::ZERO {
            return Err(Error::invalid_instrument(&self.token, "non-positive strike"));
        }

        let expiry = parse_expiry(&self.expiry)
            .map_err(|e| Error::invalid_instrument(&self.token, e.to_string()))?;

        Ok(OptionInstrument {
            token: self.token.clone(),
            symbol: self.symbol.clone(),
            underlying: self.name.clone(),
            strike,
            expiry,
            style,
            lot_size: self.lotsize.trim().parse().ok(),
        })
    }
}

/// Source of listed option instruments.
#[async_trait]
pub trait InstrumentUniverse: Send + Sync {
    /// Returns the option instruments of `underlying`.
    ///
    /// With `expiry` set, only that expiry is returned; otherwise every
    /// listed expiry is.
    ///
    /// # Errors
    ///
    /// Returns an error if the universe cannot be queried.
    async fn option_instruments(
        &self,
        underlying: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<Vec<OptionInstrument>>;
}

#[async_trait]
impl<T: InstrumentUniverse + ?Sized> InstrumentUniverse for Arc<T> {
    async fn option_instruments(
        &self,
        underlying: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<Vec<OptionInstrument>> {
        (**self).option_instruments(underlying, expiry).await
    }
}

/// Instrument universe held in memory, typically loaded from the scrip master.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUniverse {
    instruments: Vec<OptionInstrument>,
}

impl InMemoryUniverse {
    /// Creates a universe from already-decoded instruments.
    #[must_use]
    pub fn new(instruments: Vec<OptionInstrument>) -> Self {
        Self { instruments }
    }

    /// Loads option contracts from scrip master JSON (an array of records).
    ///
    /// Non-option and undecodable records are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the payload is not a JSON array of records.
    pub fn from_scrip_json(json: &str, strike_scale: u32) -> Result<Self> {
        let records: Vec<ScripRecord> = serde_json::from_str(json)?;
        let total = records.len();

        let instruments: Vec<OptionInstrument> = records
            .iter()
            .filter(|r| r.is_option())
            .filter_map(|r| match r.to_instrument(strike_scale) {
                Ok(instrument) => Some(instrument),
                Err(e) => {
                    debug!(error = %e, "skipping scrip record");
                    None
                }
            })
            .collect();

        info!(total, options = instruments.len(), "loaded instrument universe");
        Ok(Self { instruments })
    }

    /// Returns the number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Returns true if the universe is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[async_trait]
impl InstrumentUniverse for InMemoryUniverse {
    async fn option_instruments(
        &self,
        underlying: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<Vec<OptionInstrument>> {
        Ok(self
            .instruments
            .iter()
            .filter(|i| i.underlying.eq_ignore_ascii_case(underlying))
            .filter(|i| expiry.is_none_or(|e| i.expiry == e))
            .cloned()
            .collect())
    }
}
