//! Market quotes and the upstream quote source.
//!
//! The quote source answers `(segment, mode, tokens)` with either a success
//! envelope listing `fetched` records and `unfetched` tokens, or an error
//! envelope carrying a machine-readable code. [`QuoteEnvelope`] decodes that
//! wire shape; [`QuoteSource`] is the seam the fetcher talks to.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Point-in-time market snapshot for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price.
    pub last_traded_price: f64,
    /// Open interest in contracts.
    pub open_interest: u64,
    /// Traded volume for the session.
    pub volume: u64,
    /// Session open.
    pub open: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Previous close.
    pub close: Option<f64>,
    /// Total quantity bid.
    pub total_buy_quantity: Option<u64>,
    /// Total quantity offered.
    pub total_sell_quantity: Option<u64>,
}

impl Quote {
    /// Creates a quote with only price, open interest and volume.
    #[must_use]
    pub fn new(last_traded_price: f64, open_interest: u64, volume: u64) -> Self {
        Self {
            last_traded_price,
            open_interest,
            volume,
            ..Self::default()
        }
    }

    /// Returns true if the quote carries a usable traded price.
    #[must_use]
    pub fn has_price(&self) -> bool {
        self.last_traded_price > 0.0
    }
}

/// Exchange segment a token belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExchangeSegment {
    /// NSE cash market.
    Nse,
    /// NSE futures and options.
    #[default]
    Nfo,
    /// BSE cash market.
    Bse,
    /// BSE futures and options.
    Bfo,
}

impl ExchangeSegment {
    /// Upstream segment code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Nfo => "NFO",
            Self::Bse => "BSE",
            Self::Bfo => "BFO",
        }
    }
}

impl fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How much of the quote the upstream returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteMode {
    /// Last traded price only.
    Ltp,
    /// LTP plus OHLC.
    Ohlc,
    /// Everything, including volume and open interest.
    #[default]
    Full,
}

impl QuoteMode {
    /// Upstream mode code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ltp => "LTP",
            Self::Ohlc => "OHLC",
            Self::Full => "FULL",
        }
    }
}

/// Result of one successful quote request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBatch {
    /// Quotes keyed by token.
    pub quotes: HashMap<String, Quote>,
    /// Tokens the upstream could not serve inside an otherwise successful reply.
    pub unfetched: Vec<String>,
}

impl QuoteBatch {
    /// Creates a batch from quotes, with nothing unfetched.
    #[must_use]
    pub fn from_quotes(quotes: impl IntoIterator<Item = (String, Quote)>) -> Self {
        Self {
            quotes: quotes.into_iter().collect(),
            unfetched: Vec::new(),
        }
    }

    /// Sets the unfetched tokens.
    #[must_use]
    pub fn with_unfetched(mut self, unfetched: Vec<String>) -> Self {
        self.unfetched = unfetched;
        self
    }
}

/// Upstream market data reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuoteEnvelope {
    /// True for success envelopes.
    pub status: bool,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error code, empty on success.
    pub errorcode: String,
    /// Payload of a success envelope.
    pub data: Option<QuoteData>,
}

/// Payload of a success envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuoteData {
    /// Quotes that were served.
    pub fetched: Vec<FetchedQuote>,
    /// Tokens that were not.
    pub unfetched: Vec<UnfetchedToken>,
}

/// One served quote as sent on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchedQuote {
    /// Exchange token.
    pub symbol_token: String,
    /// Last traded price.
    pub ltp: f64,
    /// Session open.
    pub open: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Previous close.
    pub close: Option<f64>,
    /// Session volume.
    pub trade_volume: f64,
    /// Open interest.
    #[serde(rename = "opnInterest")]
    pub open_interest: f64,
    /// Total quantity bid.
    #[serde(rename = "totBuyQuan")]
    pub total_buy_quantity: Option<f64>,
    /// Total quantity offered.
    #[serde(rename = "totSellQuan")]
    pub total_sell_quantity: Option<f64>,
}

impl From<FetchedQuote> for Quote {
    fn from(q: FetchedQuote) -> Self {
        // `as` saturates: negatives and NaN become 0.
        Self {
            last_traded_price: q.ltp,
            open_interest: q.open_interest as u64,
            volume: q.trade_volume as u64,
            open: q.open,
            high: q.high,
            low: q.low,
            close: q.close,
            total_buy_quantity: q.total_buy_quantity.map(|v| v as u64),
            total_sell_quantity: q.total_sell_quantity.map(|v| v as u64),
        }
    }
}

/// An unfetched entry: either a bare token or a detail object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UnfetchedToken {
    /// Bare token string.
    Token(String),
    /// Detail object with the token and a reason.
    Detail {
        /// Exchange token.
        #[serde(rename = "symbolToken")]
        symbol_token: String,
        /// Reason, when given.
        #[serde(default)]
        message: String,
    },
}

impl UnfetchedToken {
    /// Returns the token.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Token(token) => token,
            Self::Detail { symbol_token, .. } => symbol_token,
        }
    }
}

impl QuoteEnvelope {
    /// Decodes an envelope from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the payload is not a valid envelope.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts the envelope into a batch or an upstream error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Upstream` with the envelope's code and message when
    /// `status` is false.
    pub fn into_batch(self) -> Result<QuoteBatch> {
        if !self.status {
            return Err(Error::upstream(self.errorcode, self.message));
        }

        let data = self.data.unwrap_or_default();
        Ok(QuoteBatch {
            unfetched: data.unfetched.iter().map(|u| u.token().to_string()).collect(),
            quotes: data
                .fetched
                .into_iter()
                .map(|q| (q.symbol_token.clone(), Quote::from(q)))
                .collect(),
        })
    }
}

/// Upstream market data capability.
///
/// Implementations report a rate-limit rejection either as
/// `Error::RateLimited` or as `Error::Upstream` with the configured
/// rate-limit code; any other error is treated as permanent.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches quotes for `tokens` in one request.
    ///
    /// # Errors
    ///
    /// Returns an error when the whole request failed.
    async fn fetch_quotes(
        &self,
        segment: ExchangeSegment,
        mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch>;
}

#[async_trait]
impl<T: QuoteSource + ?Sized> QuoteSource for Arc<T> {
    async fn fetch_quotes(
        &self,
        segment: ExchangeSegment,
        mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch> {
        (**self).fetch_quotes(segment, mode, tokens).await
    }
}
