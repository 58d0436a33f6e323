//! Option chain assembly module.
//!
//! This module narrows the listed option universe to a strike window around
//! the money, fetches quotes for it under the upstream rate limit, and pairs
//! calls and puts by strike with their Greeks.
//!
//! ## Flow
//!
//! ```text
//! ChainBuilder
//!   ├── InstrumentUniverse (listed contracts per underlying/expiry)
//!   ├── select_window (strikes around ATM)
//!   ├── RateLimitedFetcher
//!   │     └── QuoteSource (upstream market data, batched)
//!   └── GreeksCalculator (per leg, from last traded price)
//! ```
//!
//! ## Components
//!
//! - [`OptionInstrument`]: One listed contract
//! - [`InstrumentUniverse`]: Source of listed contracts; [`InMemoryUniverse`]
//!   loads them from scrip master JSON
//! - [`select_window`]: Strike window around the money
//! - [`Quote`]: Market snapshot for one token
//! - [`QuoteSource`]: Upstream market data capability
//! - [`RateLimitedFetcher`]: Sequential, paced batches with backoff
//! - [`ChainBuilder`]: Assembles an [`OptionChain`] of [`ChainRow`]s
//!
//! ## Example
//!
//! ```rust,ignore
//! use option_chain_greeks::chain::{ChainBuilder, ChainConfig, ChainRequest};
//!
//! let builder = ChainBuilder::new(universe, source, ChainConfig::default());
//! let chain = builder.build(&ChainRequest::new("RELIANCE", 1510.0, today)).await?;
//!
//! for row in &chain.rows {
//!     println!("{} {:?} {:?}", row.strike, row.call, row.put);
//! }
//! ```

mod builder;
mod fetcher;
mod instrument;
mod quote;
mod strike;

// Re-export all public types
pub use builder::{
    ChainBuilder, ChainConfig, ChainLeg, ChainRequest, ChainRow, DEFAULT_STRIKE_RADIUS,
    OptionChain, OptionChainStats,
};
pub use fetcher::{
    AbandonReason, BatchFailure, DEFAULT_BASE_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES,
    DEFAULT_PACING_DELAY, DEFAULT_RATE_LIMIT_CODE, FetchConfig, FetchReport, RateLimitedFetcher,
};
pub use instrument::{
    DEFAULT_STRIKE_SCALE, InMemoryUniverse, InstrumentUniverse, OptionInstrument, ScripRecord,
    nearest_expiry, normalize_strike,
};
pub use quote::{
    ExchangeSegment, FetchedQuote, Quote, QuoteBatch, QuoteData, QuoteEnvelope, QuoteMode,
    QuoteSource, UnfetchedToken,
};
pub use strike::{atm_strike, select_window, unique_strikes};
