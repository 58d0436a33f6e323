//! Example: Option Chain with Greeks
//!
//! This example builds an option chain around the money against an
//! in-memory instrument universe and a simulated quote source that rejects
//! every third request with the upstream rate-limit code.
//!
//! Run with: `cargo run --example chain_greeks`

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use option_chain_greeks::chain::{
    ChainBuilder, ChainConfig, ChainRequest, DEFAULT_RATE_LIMIT_CODE, ExchangeSegment,
    FetchConfig, InMemoryUniverse, OptionInstrument, Quote, QuoteBatch, QuoteMode, QuoteSource,
};
use option_chain_greeks::pricing::{BlackScholes, OptionStyle, PricingParams};
use option_chain_greeks::utils::time_to_expiry;
use option_chain_greeks::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const UNDERLYING: &str = "NIFTY";
const SPOT: f64 = 24_012.35;

/// Quotes priced off a volatility smile, throttled every third request.
struct SimulatedSource {
    prices: HashMap<String, f64>,
    requests: AtomicUsize,
}

#[async_trait]
impl QuoteSource for SimulatedSource {
    async fn fetch_quotes(
        &self,
        _segment: ExchangeSegment,
        _mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch> {
        if self.requests.fetch_add(1, Ordering::SeqCst) % 3 == 2 {
            return Err(Error::upstream(
                DEFAULT_RATE_LIMIT_CODE,
                "Access denied because of exceeding access rate",
            ));
        }
        Ok(QuoteBatch::from_quotes(tokens.iter().filter_map(|t| {
            self.prices
                .get(t)
                .map(|&ltp| (t.clone(), Quote::new(ltp, 125_000, 48_000)))
        })))
    }
}

fn smile(strike: f64) -> f64 {
    let moneyness = (strike / SPOT).ln();
    0.13 + 0.6 * moneyness * moneyness - 0.05 * moneyness
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    info!("=== Option Chain Greeks Example ===\n");

    let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap_or_default();
    let expiry = today.checked_add_days(Days::new(16)).unwrap_or(today);
    let t = time_to_expiry(expiry, today);

    // === Instrument Universe ===
    let mut instruments = Vec::new();
    let mut prices = HashMap::new();
    for (i, strike) in (22_000..=26_000).step_by(100).enumerate() {
        for style in [OptionStyle::Call, OptionStyle::Put] {
            let token = format!("{}", 50_000 + 2 * i + usize::from(style == OptionStyle::Put));
            let symbol = format!("{UNDERLYING}26FEB26{strike}{}", style.code());
            let params = PricingParams::new(SPOT, f64::from(strike), t, 0.0525, style);
            let ltp = (BlackScholes::price(&params, smile(f64::from(strike))) * 20.0).round() / 20.0;
            if ltp > 0.0 {
                prices.insert(token.clone(), ltp);
            }
            instruments.push(
                OptionInstrument::new(token, symbol, UNDERLYING, Decimal::from(strike), expiry, style)
                    .with_lot_size(75),
            );
        }
    }
    info!("Listed {} contracts for {UNDERLYING}", instruments.len());

    // === Chain Builder ===
    let config = ChainConfig::default().with_fetch(
        FetchConfig::default()
            .with_batch_size(10)
            .with_base_delay(Duration::from_millis(200))
            .with_pacing_delay(Duration::from_millis(50)),
    );
    let source = SimulatedSource {
        prices,
        requests: AtomicUsize::new(0),
    };
    let builder = ChainBuilder::new(InMemoryUniverse::new(instruments), source, config);

    let request = ChainRequest::new(UNDERLYING, SPOT, today);
    let chain = match builder.build(&request).await {
        Ok(chain) => chain,
        Err(e) => {
            info!("Chain build failed: {e}");
            return;
        }
    };

    // === Chain Table ===
    info!("\n--- {} ---", chain.stats());
    info!(
        "{:>8} | {:>8} {:>7} {:>7} {:>7} | {:>8} {:>7} {:>7} {:>7}",
        "strike", "call", "iv", "delta", "theta", "put", "iv", "delta", "theta"
    );
    for row in &chain.rows {
        let side = |style| match row.leg(style) {
            Some(leg) if leg.price_available() => format!(
                "{:>8.2} {:>7} {:>7} {:>7}",
                leg.quote.as_ref().map_or(0.0, |q| q.last_traded_price),
                leg.greeks.implied_volatility,
                leg.greeks.delta,
                leg.greeks.theta
            ),
            _ => format!("{:>31}", "price unavailable"),
        };
        info!(
            "{:>8} | {} | {}",
            row.strike,
            side(OptionStyle::Call),
            side(OptionStyle::Put)
        );
    }

    if let Ok(atm) = chain.atm_strike() {
        info!("\nATM strike: {atm}");
        if let Some(call) = chain.row(atm).and_then(|r| r.call.as_ref()) {
            let fitted = smile(atm.to_f64().unwrap_or(SPOT)) * 100.0;
            info!(
                "ATM call IV {}% (smile {:.2}%), vega {} per 1%",
                call.greeks.implied_volatility, fitted, call.greeks.vega
            );
        }
    }
    info!("Missing tokens: {:?}", chain.missing_tokens);
}
