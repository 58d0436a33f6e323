//! Integration tests for the rate-limited quote fetcher.

use async_trait::async_trait;
use option_chain_greeks::chain::{
    AbandonReason, DEFAULT_RATE_LIMIT_CODE, ExchangeSegment, FetchConfig, Quote, QuoteBatch,
    QuoteEnvelope, QuoteMode, QuoteSource, RateLimitedFetcher,
};
use option_chain_greeks::{Error, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn tokens(n: usize) -> Vec<String> {
    (1..=n).map(|i| (40_000 + i).to_string()).collect()
}

fn serve(tokens: &[String]) -> QuoteBatch {
    QuoteBatch::from_quotes(
        tokens
            .iter()
            .map(|t| (t.clone(), Quote::new(12.5, 10_000, 250))),
    )
}

/// Fails every second request with a non-transient upstream error.
#[derive(Default)]
struct AlternatingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl QuoteSource for AlternatingSource {
    async fn fetch_quotes(
        &self,
        _segment: ExchangeSegment,
        _mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % 2 == 0 {
            return Err(Error::upstream("AB1004", "Something Went Wrong"));
        }
        Ok(serve(tokens))
    }
}

/// Rejects the first `limited` requests with the rate-limit envelope.
struct ThrottledSource {
    limited: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl QuoteSource for ThrottledSource {
    async fn fetch_quotes(
        &self,
        _segment: ExchangeSegment,
        _mode: QuoteMode,
        tokens: &[String],
    ) -> Result<QuoteBatch> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.limited {
            let json = r#"{"status":false,"message":"Access denied because of exceeding access rate","errorcode":"AB1019","data":null}"#;
            return QuoteEnvelope::from_json(json)?.into_batch();
        }
        Ok(serve(tokens))
    }
}

#[tokio::test(start_paused = true)]
async fn test_partial_failure_keeps_successful_batches() {
    let config = FetchConfig::default().with_batch_size(5);
    let fetcher = RateLimitedFetcher::new(AlternatingSource::default(), config);
    let requested = tokens(12);

    let report = fetcher.fetch(&requested).await;

    let fetched: HashSet<&str> = report.quotes.keys().map(String::as_str).collect();
    let expected: HashSet<&str> = requested[..5]
        .iter()
        .chain(&requested[10..])
        .map(String::as_str)
        .collect();
    assert_eq!(fetched, expected);
    assert_eq!(report.batch_count, 3);
    assert_eq!(report.failed_batches.len(), 1);
    assert_eq!(report.failed_batches[0].index, 1);
    assert!(matches!(
        report.failed_batches[0].reason,
        AbandonReason::Failed(Error::Upstream { .. })
    ));
    let missing: Vec<&str> = requested[5..10].iter().map(String::as_str).collect();
    assert_eq!(report.missing(&requested), missing);
    assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retry_waits_for_backoff() {
    let base = Duration::from_secs(1);
    let config = FetchConfig::default().with_base_delay(base);
    let source = ThrottledSource {
        limited: 2,
        calls: AtomicUsize::new(0),
    };
    let fetcher = RateLimitedFetcher::new(source, config);
    let requested = tokens(3);

    let start = Instant::now();
    let report = fetcher.fetch(&requested).await;

    assert_eq!(report.len(), 3);
    assert!(report.is_complete());
    assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= base + 2 * base);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_is_not_fatal() {
    let config = FetchConfig::default()
        .with_batch_size(2)
        .with_max_retries(2)
        .with_base_delay(Duration::from_millis(500));
    let source = ThrottledSource {
        limited: 3,
        calls: AtomicUsize::new(0),
    };
    let fetcher = RateLimitedFetcher::new(source, config);
    let requested = tokens(4);

    let report = fetcher.fetch(&requested).await;

    assert_eq!(
        report.failed_batches[0].reason,
        AbandonReason::RetriesExhausted { attempts: 3 }
    );
    assert_eq!(report.len(), 2);
    assert!(!report.all_batches_failed());
}

#[tokio::test(start_paused = true)]
async fn test_custom_rate_limit_code() {
    let config = FetchConfig::default().with_rate_limit_code("AB1004");
    assert_ne!(config.rate_limit_code, DEFAULT_RATE_LIMIT_CODE);

    let fetcher = RateLimitedFetcher::new(AlternatingSource::default(), config.with_batch_size(2));
    let report = fetcher.fetch(&tokens(4)).await;

    // The second request is now retried instead of abandoned.
    assert_eq!(report.len(), 4);
    assert!(report.failed_batches.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overall_timeout_returns_partial() {
    let config = FetchConfig::default()
        .with_batch_size(1)
        .with_pacing_delay(Duration::from_secs(1))
        .with_timeout(Duration::from_millis(2500));
    let fetcher = RateLimitedFetcher::new(AlternatingSource::default(), config);
    let requested = tokens(6);

    let start = Instant::now();
    let report = fetcher.fetch(&requested).await;

    // Requests at t=0, 1 and 2; the pause before the fourth hits the deadline.
    assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.len(), 2);
    assert_eq!(report.skipped, requested[3..].to_vec());
    assert!(start.elapsed() <= Duration::from_millis(2500));
}
