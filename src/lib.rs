//! # Option Chain Greeks - Implied Volatility and Rate-Limited Chain Assembly
//!
//! A Rust library that builds option chains around the money from a
//! rate-limited market data upstream and derives each option's implied
//! volatility and Greeks from its traded price with the Black-Scholes model.
//!
//! ## Key Features
//!
//! - **Robust IV Solver**: Newton-Raphson seeded with the
//!   Brenner-Subrahmanyam approximation, falling back to bisection when it
//!   does not converge. The caller always gets a finite volatility.
//!
//! - **Rounded Greeks**: Delta, gamma, theta (per day) and vega (per 1% IV)
//!   as `rust_decimal::Decimal` values with fixed display precision.
//!
//! - **Degenerate Inputs Are Not Errors**: Expired, zero-priced or
//!   arbitrage-inconsistent options resolve to zero Greeks instead of
//!   aborting the chain.
//!
//! - **Rate-Aware Fetching**: Sequential, paced batches with exponential
//!   backoff on rate-limit rejections and an optional overall deadline.
//!   Failed batches only lose their own tokens.
//!
//! - **Explicit Collaborators**: The instrument universe and the quote
//!   source are traits passed to the builder, so chains can be built against
//!   in-memory fakes.
//!
//! ## Architecture
//!
//! ```text
//! ChainBuilder (per request: underlying, spot, expiry)
//!   ├── InstrumentUniverse ──▶ listed contracts ──▶ select_window (±radius around ATM)
//!   ├── RateLimitedFetcher ──▶ QuoteSource (batched, paced, backoff)
//!   └── GreeksCalculator
//!         └── ImpliedVolatility (NewtonRaphson ─▶ Bisection)
//!               └── BlackScholes (price, vega)
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pricing`] | Black-Scholes pricing, implied volatility and Greeks |
//! | [`chain`] | Instruments, strike window, quote fetching and chain assembly |
//! | [`error`] | Error types and `Result` type alias |
//! | [`utils`] | Expiry parsing, time to expiry and decimal rounding |
//!
//! ## Core Components
//!
//! ### Pricing ([`pricing`])
//!
//! - [`pricing::BlackScholes`]: European option price and vega
//! - [`pricing::ImpliedVolatility`]: IV solver with a fallback strategy
//! - [`pricing::GreeksCalculator`]: IV and Greeks as a [`pricing::GreeksResult`]
//!
//! ### Chain ([`chain`])
//!
//! - [`chain::select_window`]: Strikes around the money
//! - [`chain::RateLimitedFetcher`]: Batched quote fetching
//! - [`chain::ChainBuilder`]: Assembles an [`chain::OptionChain`]
//!
//! ## Example Usage
//!
//! ### Greeks from a Traded Price
//!
//! ```rust
//! use option_chain_greeks::pricing::{GreeksCalculator, PricingParams, DEFAULT_RISK_FREE_RATE};
//! use rust_decimal::Decimal;
//!
//! let params = PricingParams::call(1510.0, 1500.0, 14.0 / 365.0, DEFAULT_RISK_FREE_RATE);
//! let greeks = GreeksCalculator::default().from_price(&params, 28.0);
//!
//! assert!(greeks.implied_volatility > Decimal::ZERO);
//! assert!(greeks.delta > Decimal::ZERO && greeks.delta < Decimal::ONE);
//! ```
//!
//! ### Strike Window
//!
//! ```rust
//! use option_chain_greeks::chain::select_window;
//!
//! let strikes = [100, 150, 200, 250, 300, 350, 400];
//! assert_eq!(select_window(&strikes, 225, 2), &[150, 200, 250, 300, 350]);
//! ```
//!
//! ### Building a Chain
//!
//! ```rust,ignore
//! use option_chain_greeks::chain::{ChainBuilder, ChainConfig, ChainRequest, InMemoryUniverse};
//!
//! let universe = InMemoryUniverse::from_scrip_json(&scrip_master, 2)?;
//! let builder = ChainBuilder::new(universe, quote_source, ChainConfig::default());
//! let chain = builder.build(&ChainRequest::new("RELIANCE", 1510.0, today)).await?;
//! println!("{}", chain.stats());
//! ```
//!
//! ## Examples
//!
//! | Example | Description |
//! |---------|-------------|
//! | `chain_greeks` | Builds a chain against an in-memory universe and quote source |
//!
//! Run examples with:
//! ```bash
//! cargo run --example chain_greeks
//! ```
//!
//! ## Benchmarks
//!
//! - **pricing_bench**: Black-Scholes price, IV solve and Greeks
//! - **window_bench**: Strike window selection
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench
//! cargo bench -- pricing_benches
//! ```
//!
//! ## Dependencies
//!
//! - **statrs** (0.18): Error function for the normal distribution
//! - **rust_decimal** (1.39): Precise decimal arithmetic for strikes and Greeks
//! - **chrono** (0.4): Expiry dates
//! - **tokio** (1.48): Backoff and pacing timers
//! - **async-trait** (0.1): Async collaborator traits
//! - **thiserror** (2.0): Error handling
//! - **tracing** (0.1): Structured logging
//! - **serde** (1.0): Serialization support

pub mod chain;
pub mod error;
pub mod pricing;
pub mod utils;

pub use error::{Error, Result};
