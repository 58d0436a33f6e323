//! Option chain assembly.
//!
//! [`ChainBuilder`] owns its collaborators (instrument universe and quote
//! source) and turns a [`ChainRequest`] into an [`OptionChain`]:
//!
//! ```text
//! universe ─▶ expiry ─▶ strike window ─▶ fetcher ─▶ Greeks ─▶ rows by strike
//! ```
//!
//! Legs whose quote is missing or unpriced stay in the chain with zero
//! Greeks, so a gap in the middle of the window is visible to the caller.

use super::fetcher::{FetchConfig, RateLimitedFetcher};
use super::instrument::{InstrumentUniverse, OptionInstrument, nearest_expiry};
use super::quote::{Quote, QuoteSource};
use super::strike::{atm_strike, select_window, unique_strikes};
use crate::error::{Error, Result};
use crate::pricing::{
    DEFAULT_RISK_FREE_RATE, GreeksCalculator, GreeksResult, OptionStyle, PricingParams,
    SolverConfig,
};
use crate::utils::{format_expiry, time_to_expiry};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Default number of strikes on each side of the money.
pub const DEFAULT_STRIKE_RADIUS: usize = 8;

/// Chain assembly configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    /// Strikes kept on each side of the money.
    pub radius: usize,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    /// Implied volatility solver settings.
    pub solver: SolverConfig,
    /// Quote fetcher settings.
    pub fetch: FetchConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_STRIKE_RADIUS,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            solver: SolverConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Creates a new chain configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strike radius.
    #[must_use]
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the risk-free rate.
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Sets the solver configuration.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Sets the fetcher configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }
}

/// A chain request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRequest {
    /// Underlying symbol.
    pub underlying: String,
    /// Current spot price of the underlying.
    pub spot: f64,
    /// Expiry; the nearest listed one when `None`.
    pub expiry: Option<NaiveDate>,
    /// Valuation date.
    pub today: NaiveDate,
}

impl ChainRequest {
    /// Creates a request for the nearest expiry.
    #[must_use]
    pub fn new(underlying: impl Into<String>, spot: f64, today: NaiveDate) -> Self {
        Self {
            underlying: underlying.into(),
            spot,
            expiry: None,
            today,
        }
    }

    /// Pins the expiry.
    #[must_use]
    pub const fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// One side of a chain row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLeg {
    /// Exchange token.
    pub token: String,
    /// Trading symbol.
    pub symbol: String,
    /// Quote, if one was fetched.
    pub quote: Option<Quote>,
    /// Greeks; zero when no price was available.
    pub greeks: GreeksResult,
}

impl ChainLeg {
    /// Returns true if the leg has a usable traded price.
    #[must_use]
    pub fn price_available(&self) -> bool {
        self.quote.as_ref().is_some_and(Quote::has_price)
    }
}

/// Call and put legs sharing one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRow {
    /// Strike price.
    #[serde(with = "rust_decimal::serde::float")]
    pub strike: Decimal,
    /// Call leg, if listed.
    pub call: Option<ChainLeg>,
    /// Put leg, if listed.
    pub put: Option<ChainLeg>,
}

impl ChainRow {
    /// Creates an empty row.
    #[must_use]
    pub const fn new(strike: Decimal) -> Self {
        Self {
            strike,
            call: None,
            put: None,
        }
    }

    /// Returns the leg of the given style.
    #[must_use]
    pub const fn leg(&self, style: OptionStyle) -> Option<&ChainLeg> {
        match style {
            OptionStyle::Call => self.call.as_ref(),
            OptionStyle::Put => self.put.as_ref(),
        }
    }

    /// Returns true if both legs are listed and priced.
    #[must_use]
    pub fn is_fully_priced(&self) -> bool {
        self.call.as_ref().is_some_and(ChainLeg::price_available)
            && self.put.as_ref().is_some_and(ChainLeg::price_available)
    }

    /// Stores `leg`, returning the leg it replaced.
    fn set_leg(&mut self, style: OptionStyle, leg: ChainLeg) -> Option<ChainLeg> {
        match style {
            OptionStyle::Call => self.call.replace(leg),
            OptionStyle::Put => self.put.replace(leg),
        }
    }

    fn legs(&self) -> impl Iterator<Item = &ChainLeg> {
        self.call.iter().chain(self.put.iter())
    }
}

/// An assembled option chain for one underlying and expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    /// Underlying symbol.
    pub underlying: String,
    /// Spot price used for pricing.
    pub spot: f64,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Time to expiry in years.
    pub time_to_expiry: f64,
    /// Rows, strictly ascending by strike.
    pub rows: Vec<ChainRow>,
    /// Requested tokens without a quote.
    pub missing_tokens: Vec<String>,
}

impl OptionChain {
    /// Returns the strikes of the chain, ascending.
    #[must_use]
    pub fn strikes(&self) -> Vec<Decimal> {
        self.rows.iter().map(|r| r.strike).collect()
    }

    /// Returns the row at `strike`.
    #[must_use]
    pub fn row(&self, strike: Decimal) -> Option<&ChainRow> {
        self.rows
            .binary_search_by_key(&strike, |r| r.strike)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Returns the strike closest to spot.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoDataAvailable` if the chain is empty or spot is not
    /// representable.
    pub fn atm_strike(&self) -> Result<Decimal> {
        let spot = Decimal::from_f64(self.spot)
            .ok_or_else(|| Error::no_data(format!("unrepresentable spot {}", self.spot)))?;
        atm_strike(&self.strikes(), spot)
    }

    /// Returns true if the chain has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns statistics about this chain.
    #[must_use]
    pub fn stats(&self) -> OptionChainStats {
        let (priced, unpriced) = self
            .rows
            .iter()
            .flat_map(ChainRow::legs)
            .fold((0, 0), |(p, u), leg| {
                if leg.price_available() {
                    (p + 1, u)
                } else {
                    (p, u + 1)
                }
            });

        OptionChainStats {
            underlying: self.underlying.clone(),
            expiry: self.expiry,
            strike_count: self.rows.len(),
            priced_legs: priced,
            unpriced_legs: unpriced,
        }
    }
}

/// Statistics about an option chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionChainStats {
    /// Underlying symbol.
    pub underlying: String,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Number of strikes.
    pub strike_count: usize,
    /// Legs with a traded price.
    pub priced_legs: usize,
    /// Legs without one.
    pub unpriced_legs: usize,
}

impl fmt::Display for OptionChainStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} strikes, {} priced legs, {} unavailable",
            self.underlying,
            format_expiry(self.expiry),
            self.strike_count,
            self.priced_legs,
            self.unpriced_legs
        )
    }
}

/// Builds option chains from an instrument universe and a quote source.
pub struct ChainBuilder<U, S> {
    universe: U,
    fetcher: RateLimitedFetcher<S>,
    calculator: GreeksCalculator,
    config: ChainConfig,
}

impl<U: InstrumentUniverse, S: QuoteSource> ChainBuilder<U, S> {
    /// Creates a builder.
    #[must_use]
    pub fn new(universe: U, source: S, config: ChainConfig) -> Self {
        Self {
            universe,
            fetcher: RateLimitedFetcher::new(source, config.fetch.clone()),
            calculator: GreeksCalculator::new(config.solver.clone()),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Returns the quote fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &RateLimitedFetcher<S> {
        &self.fetcher
    }

    /// Builds the chain for `request`.
    ///
    /// Partial quote coverage is not an error: unquoted legs carry zero
    /// Greeks and their tokens are listed in `missing_tokens`.
    ///
    /// # Errors
    ///
    /// - `Error::InstrumentNotFound` if the underlying has no listed options
    /// - `Error::ExpiryNotFound` if the requested expiry is not listed
    /// - `Error::NoDataAvailable` if spot is not positive or no expiry is
    ///   left on or after `today`
    /// - any error of the instrument universe
    pub async fn build(&self, request: &ChainRequest) -> Result<OptionChain> {
        let spot = Decimal::from_f64(request.spot)
            .filter(|s| *s > Decimal::ZERO)
            .ok_or_else(|| Error::no_data(format!("invalid spot price {}", request.spot)))?;

        let instruments = self
            .universe
            .option_instruments(&request.underlying, request.expiry)
            .await?;
        let (expiry, instruments) = match request.expiry {
            Some(expiry) if instruments.is_empty() => {
                return Err(Error::expiry_not_found(format_expiry(expiry)));
            }
            Some(expiry) => (expiry, instruments),
            None if instruments.is_empty() => {
                return Err(Error::instrument_not_found(&request.underlying));
            }
            None => {
                let expiry = nearest_expiry(&instruments, request.today).ok_or_else(|| {
                    Error::no_data(format!("no live expiry for {}", request.underlying))
                })?;
                let listed: Vec<OptionInstrument> = instruments
                    .into_iter()
                    .filter(|i| i.expiry == expiry)
                    .collect();
                (expiry, listed)
            }
        };

        // Universe lookups ignore case; report the listed name.
        let underlying = instruments
            .first()
            .map_or_else(|| request.underlying.clone(), |i| i.underlying.clone());

        let strikes = unique_strikes(&instruments);
        let window = select_window(&strikes, spot, self.config.radius);
        let selected: Vec<&OptionInstrument> = instruments
            .iter()
            .filter(|i| window.binary_search(&i.strike).is_ok())
            .collect();
        debug!(
            underlying = %request.underlying,
            expiry = %expiry,
            listed = strikes.len(),
            window = window.len(),
            "selected strike window"
        );

        let tokens: Vec<String> = selected.iter().map(|i| i.token.clone()).collect();
        let report = self.fetcher.fetch(&tokens).await;
        if report.is_empty() && !tokens.is_empty() {
            if report.all_batches_failed() {
                error!(underlying = %request.underlying, "every quote batch failed");
            } else {
                warn!(underlying = %request.underlying, "no quotes matched the selected tokens");
            }
        }
        let missing_tokens: Vec<String> = report
            .missing(&tokens)
            .into_iter()
            .map(str::to_string)
            .collect();

        let t = time_to_expiry(expiry, request.today);
        let mut rows: BTreeMap<Decimal, ChainRow> = BTreeMap::new();
        for instrument in selected {
            let quote = report.quotes.get(&instrument.token).cloned();
            let greeks = match &quote {
                Some(q) if q.has_price() => {
                    let params = PricingParams::new(
                        request.spot,
                        instrument.strike.to_f64().unwrap_or_default(),
                        t,
                        self.config.risk_free_rate,
                        instrument.style,
                    );
                    self.calculator.from_price(&params, q.last_traded_price)
                }
                _ => GreeksResult::ZERO,
            };

            let leg = ChainLeg {
                token: instrument.token.clone(),
                symbol: instrument.symbol.clone(),
                quote,
                greeks,
            };
            let replaced = rows
                .entry(instrument.strike)
                .or_insert_with(|| ChainRow::new(instrument.strike))
                .set_leg(instrument.style, leg);
            if let Some(previous) = replaced {
                warn!(
                    underlying = %underlying,
                    strike = %instrument.strike,
                    style = %instrument.style,
                    replaced = %previous.token,
                    kept = %instrument.token,
                    "duplicate contract for strike and side"
                );
            }
        }

        let chain = OptionChain {
            underlying,
            spot: request.spot,
            expiry,
            time_to_expiry: t,
            rows: rows.into_values().collect(),
            missing_tokens,
        };
        info!(chain = %chain.stats(), "option chain built");
        Ok(chain)
    }
}
