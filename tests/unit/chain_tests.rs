//! Integration tests for chain assembly.

use async_trait::async_trait;
use chrono::NaiveDate;
use option_chain_greeks::chain::{
    ChainBuilder, ChainConfig, ChainRequest, DEFAULT_STRIKE_SCALE, ExchangeSegment, FetchConfig,
    InMemoryUniverse, QuoteBatch, QuoteEnvelope, QuoteMode, QuoteSource,
};
use option_chain_greeks::pricing::OptionStyle;
use option_chain_greeks::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const SCRIP_MASTER: &str = r#"[
    {"token":"2885","symbol":"RELIANCE-EQ","name":"RELIANCE","expiry":"","strike":"-1.000000","lotsize":"1","instrumenttype":"","exch_seg":"NSE","tick_size":"10.000000"},
    {"token":"35001","symbol":"RELIANCE24FEB261450CE","name":"RELIANCE","expiry":"24FEB2026","strike":"145000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35002","symbol":"RELIANCE24FEB261450PE","name":"RELIANCE","expiry":"24FEB2026","strike":"145000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35003","symbol":"RELIANCE24FEB261500CE","name":"RELIANCE","expiry":"24FEB2026","strike":"150000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35004","symbol":"RELIANCE24FEB261500PE","name":"RELIANCE","expiry":"24FEB2026","strike":"150000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35005","symbol":"RELIANCE24FEB261550CE","name":"RELIANCE","expiry":"24FEB2026","strike":"155000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35006","symbol":"RELIANCE24FEB261550PE","name":"RELIANCE","expiry":"24FEB2026","strike":"155000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"35007","symbol":"RELIANCE24FEB261600CE","name":"RELIANCE","expiry":"24FEB2026","strike":"160000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"},
    {"token":"36001","symbol":"RELIANCE31MAR261500CE","name":"RELIANCE","expiry":"31MAR2026","strike":"150000.000000","lotsize":"250","instrumenttype":"OPTSTK","exch_seg":"NFO","tick_size":"5.000000"}
]"#;

/// Answers with upstream JSON envelopes; the first request is rate limited.
struct EnvelopeSource {
    ltp: HashMap<&'static str, f64>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl EnvelopeSource {
    fn new(ltp: &[(&'static str, f64)]) -> Self {
        Self {
            ltp: ltp.iter().copied().collect(),
            requests: Mutex::default(),
        }
    }
}

#[async_trait]
impl QuoteSource for EnvelopeSource {
    async fn fetch_quotes(
        &self,
        segment: ExchangeSegment,
        mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch> {
        assert_eq!(segment, ExchangeSegment::Nfo);
        assert_eq!(mode, QuoteMode::Full);

        let first = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(tokens.to_vec());
            requests.len() == 1
        };
        if first {
            return QuoteEnvelope::from_json(
                r#"{"status":false,"message":"Access denied because of exceeding access rate","errorcode":"AB1019","data":null}"#,
            )?
            .into_batch();
        }

        let (fetched, unfetched): (Vec<_>, Vec<_>) =
            tokens.iter().partition(|t| self.ltp.contains_key(t.as_str()));
        let fetched: Vec<String> = fetched
            .iter()
            .map(|t| {
                format!(
                    r#"{{"exchange":"NFO","symbolToken":"{t}","ltp":{},"tradeVolume":1200,"opnInterest":45000}}"#,
                    self.ltp[t.as_str()]
                )
            })
            .collect();
        let unfetched: Vec<String> = unfetched.iter().map(|t| format!("\"{t}\"")).collect();
        let json = format!(
            r#"{{"status":true,"message":"SUCCESS","errorcode":"","data":{{"fetched":[{}],"unfetched":[{}]}}}}"#,
            fetched.join(","),
            unfetched.join(",")
        );
        QuoteEnvelope::from_json(&json)?.into_batch()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config() -> ChainConfig {
    ChainConfig::default().with_radius(1).with_fetch(
        FetchConfig::default()
            .with_batch_size(4)
            .with_base_delay(Duration::from_millis(200))
            .with_pacing_delay(Duration::from_millis(100)),
    )
}

fn builder(ltp: &[(&'static str, f64)]) -> ChainBuilder<InMemoryUniverse, EnvelopeSource> {
    let universe = InMemoryUniverse::from_scrip_json(SCRIP_MASTER, DEFAULT_STRIKE_SCALE).unwrap();
    ChainBuilder::new(universe, EnvelopeSource::new(ltp), config())
}

#[tokio::test(start_paused = true)]
async fn test_chain_end_to_end() {
    let builder = builder(&[
        ("35001", 72.0),
        ("35002", 9.5),
        ("35003", 34.0),
        ("35004", 21.0),
        ("35005", 11.0),
    ]);
    let request = ChainRequest::new("RELIANCE", 1512.0, date(2026, 2, 10));
    let chain = builder.build(&request).await.unwrap();

    assert_eq!(chain.expiry, date(2026, 2, 24));
    assert_eq!(chain.strikes(), vec![dec!(1500), dec!(1550), dec!(1600)]);
    assert!(chain.rows.windows(2).all(|w| w[0].strike < w[1].strike));
    assert!((chain.time_to_expiry - 14.0 / 365.0).abs() < 1e-12);

    // One rate-limited attempt, then two batches of the five window tokens.
    let requests = builder.fetcher().source().requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0], requests[1]);

    let atm = chain.row(dec!(1500)).unwrap();
    assert!(atm.is_fully_priced());
    let call = atm.leg(OptionStyle::Call).unwrap();
    assert_eq!(call.symbol, "RELIANCE24FEB261500CE");
    assert_eq!(call.quote.as_ref().unwrap().open_interest, 45_000);
    assert!(call.greeks.implied_volatility > Decimal::ZERO);
    assert!(call.greeks.theta < Decimal::ZERO);

    // Listed but unquoted legs stay in the chain as price unavailable.
    let far = chain.row(dec!(1600)).unwrap();
    assert!(far.put.is_none());
    let far_call = far.call.as_ref().unwrap();
    assert!(!far_call.price_available());
    assert!(far_call.greeks.is_zero());

    assert_eq!(chain.missing_tokens, vec!["35006".to_string(), "35007".to_string()]);
    assert_eq!(chain.stats().unpriced_legs, 2);
}

#[tokio::test(start_paused = true)]
async fn test_chain_no_quotes_keeps_rows() {
    let builder = builder(&[]);
    let request =
        ChainRequest::new("RELIANCE", 1500.0, date(2026, 2, 10)).with_expiry(date(2026, 3, 31));
    let chain = builder.build(&request).await.unwrap();

    assert_eq!(chain.strikes(), vec![dec!(1500)]);
    assert_eq!(chain.missing_tokens, vec!["36001".to_string()]);
    assert!(chain.rows[0].call.as_ref().unwrap().greeks.is_zero());
}

#[tokio::test(start_paused = true)]
async fn test_chain_unknown_underlying() {
    let builder = builder(&[]);
    let err = builder
        .build(&ChainRequest::new("INFY", 1800.0, date(2026, 2, 10)))
        .await
        .unwrap_err();

    assert_eq!(err, Error::InstrumentNotFound("INFY".to_string()));
    assert!(builder.fetcher().source().requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_chain_serializes() {
    let builder = builder(&[("35003", 34.0)]);
    let chain = builder
        .build(&ChainRequest::new("RELIANCE", 1500.0, date(2026, 2, 10)))
        .await
        .unwrap();

    let json = serde_json::to_value(&chain).unwrap();
    assert_eq!(json["underlying"], "RELIANCE");
    assert_eq!(json["rows"].as_array().unwrap().len(), 3);
    assert_eq!(json["rows"][1]["strike"], 1500.0);
}
