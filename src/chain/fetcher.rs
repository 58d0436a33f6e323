//! Rate-limited batched quote fetcher.
//!
//! Tokens are split into fixed-size batches that are requested one after
//! another, never concurrently, with a pacing delay between batches. Each
//! batch is a small state machine:
//!
//! ```text
//! Pending ──success──────────────────────────▶ Done
//! Pending ──rate limited, retries remain─────▶ Pending (after backoff)
//! Pending ──rate limited, retries exhausted──▶ Abandoned
//! Pending ──any other error──────────────────▶ Abandoned
//! Pending ──deadline─────────────────────────▶ Abandoned
//! ```
//!
//! Failures only lose the affected batch: the returned [`FetchReport`]
//! always holds every quote that was served.

use super::quote::{ExchangeSegment, Quote, QuoteBatch, QuoteMode, QuoteSource};
use crate::error::Error;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tracing::{debug, error, info, warn};

/// Default number of tokens per request.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default number of retries after a rate-limit rejection.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default pause between successive batches.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(1);
/// Upstream error code for "exceeding access rate".
pub const DEFAULT_RATE_LIMIT_CODE: &str = "AB1019";

/// Fetcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Tokens per request.
    pub batch_size: usize,
    /// Retries after a rate-limit rejection before a batch is abandoned.
    pub max_retries: u32,
    /// Backoff before retry `n` is `base_delay × 2ⁿ`.
    pub base_delay: Duration,
    /// Pause between successive batches, whatever their outcome.
    pub pacing_delay: Duration,
    /// Upstream error code that marks a rate-limit rejection.
    pub rate_limit_code: String,
    /// Exchange segment of the requested tokens.
    pub segment: ExchangeSegment,
    /// Quote detail level.
    pub mode: QuoteMode,
    /// Overall time budget for one fetch, if any.
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            pacing_delay: DEFAULT_PACING_DELAY,
            rate_limit_code: DEFAULT_RATE_LIMIT_CODE.to_string(),
            segment: ExchangeSegment::default(),
            mode: QuoteMode::default(),
            timeout: None,
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the retry ceiling for rate-limit rejections.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff base delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the pause between batches.
    #[must_use]
    pub fn with_pacing_delay(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    /// Sets the rate-limit error code.
    #[must_use]
    pub fn with_rate_limit_code(mut self, code: impl Into<String>) -> Self {
        self.rate_limit_code = code.into();
        self
    }

    /// Sets the exchange segment.
    #[must_use]
    pub fn with_segment(mut self, segment: ExchangeSegment) -> Self {
        self.segment = segment;
        self
    }

    /// Sets the quote mode.
    #[must_use]
    pub fn with_mode(mut self, mode: QuoteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the overall time budget of a fetch.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Backoff before retry number `attempt` (0-based): `base_delay × 2^attempt`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Why a batch was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// Every attempt was rate limited.
    RetriesExhausted {
        /// Requests issued for the batch.
        attempts: u32,
    },
    /// A non-transient upstream or transport error.
    Failed(Error),
    /// The fetch deadline passed.
    Deadline,
}

/// A batch that produced no quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Position of the batch in the plan.
    pub index: usize,
    /// Tokens of the batch.
    pub tokens: Vec<String>,
    /// Why it was abandoned.
    pub reason: AbandonReason,
}

/// Outcome of a fetch.
///
/// Compare [`quotes`](Self::quotes) with the requested tokens to detect
/// partial coverage; the fetcher itself never fails for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    /// Quotes keyed by token.
    pub quotes: HashMap<String, Quote>,
    /// Tokens reported as unfetched inside successful replies.
    pub unfetched: Vec<String>,
    /// Batches that were abandoned.
    pub failed_batches: Vec<BatchFailure>,
    /// Tokens never requested because the deadline passed first.
    pub skipped: Vec<String>,
    /// Number of batches planned.
    pub batch_count: usize,
}

impl FetchReport {
    /// Returns the number of quotes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Returns true if no quote was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Returns true if every batch succeeded and nothing was unfetched or skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.unfetched.is_empty() && self.skipped.is_empty()
    }

    /// Returns true if batches were planned and all of them were abandoned.
    #[must_use]
    pub fn all_batches_failed(&self) -> bool {
        self.batch_count > 0 && self.failed_batches.len() == self.batch_count
    }

    /// Returns the requested tokens that have no quote, in request order.
    #[must_use]
    pub fn missing<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|t| !self.quotes.contains_key(t.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Consumes the report, returning the quote map.
    #[must_use]
    pub fn into_quotes(self) -> HashMap<String, Quote> {
        self.quotes
    }

    fn merge(&mut self, batch: QuoteBatch) {
        self.quotes.extend(batch.quotes);
        self.unfetched.extend(batch.unfetched);
    }
}

enum BatchState {
    Pending { attempt: u32 },
    Done(QuoteBatch),
    Abandoned(AbandonReason),
}

/// Fetches quotes in paced, sequential batches with backoff on rate limits.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher<S> {
    source: S,
    config: FetchConfig,
}

impl<S: QuoteSource> RateLimitedFetcher<S> {
    /// Creates a fetcher over `source`.
    #[must_use]
    pub fn new(source: S, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Returns the quote source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Fetches quotes for `tokens`, honouring the configured timeout.
    pub async fn fetch(&self, tokens: &[String]) -> FetchReport {
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        self.fetch_until(tokens, deadline).await
    }

    /// Fetches quotes for `tokens`, stopping at `deadline`.
    ///
    /// Duplicate tokens are requested once. An empty token set returns an
    /// empty report without any request. When the deadline passes, no
    /// further request is issued and the quotes gathered so far are returned.
    pub async fn fetch_until(&self, tokens: &[String], deadline: Option<Instant>) -> FetchReport {
        let mut seen = HashSet::with_capacity(tokens.len());
        let unique: Vec<String> = tokens
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();

        let mut report = FetchReport::default();
        if unique.is_empty() {
            return report;
        }

        let batches: Vec<&[String]> = unique.chunks(self.config.batch_size.max(1)).collect();
        report.batch_count = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            if index > 0 && !pause(self.config.pacing_delay, deadline).await {
                warn!(index, "fetch deadline reached between batches");
                report.skipped = batches[index..].concat();
                break;
            }

            match self.run_batch(index, batch, deadline).await {
                Ok(result) => {
                    debug!(
                        index,
                        fetched = result.quotes.len(),
                        unfetched = result.unfetched.len(),
                        "batch done"
                    );
                    if !result.unfetched.is_empty() {
                        warn!(index, tokens = ?result.unfetched, "upstream left tokens unfetched");
                    }
                    report.merge(result);
                }
                Err(reason) => {
                    error!(index, size = batch.len(), ?reason, "batch abandoned");
                    let stop = reason == AbandonReason::Deadline;
                    report.failed_batches.push(BatchFailure {
                        index,
                        tokens: batch.to_vec(),
                        reason,
                    });
                    if stop {
                        report.skipped = batches[index + 1..].concat();
                        break;
                    }
                }
            }
        }

        info!(
            requested = unique.len(),
            fetched = report.quotes.len(),
            batches = report.batch_count,
            failed = report.failed_batches.len(),
            skipped = report.skipped.len(),
            "quote fetch finished"
        );
        report
    }

    async fn run_batch(
        &self,
        index: usize,
        tokens: &[String],
        deadline: Option<Instant>,
    ) -> Result<QuoteBatch, AbandonReason> {
        let mut state = BatchState::Pending { attempt: 0 };

        loop {
            let attempt = match state {
                BatchState::Pending { attempt } => attempt,
                BatchState::Done(batch) => return Ok(batch),
                BatchState::Abandoned(reason) => return Err(reason),
            };

            state = match self.request(tokens, deadline).await {
                None => BatchState::Abandoned(AbandonReason::Deadline),
                Some(Ok(batch)) => BatchState::Done(batch),
                Some(Err(err)) if self.is_rate_limited(&err) => {
                    if attempt >= self.config.max_retries {
                        BatchState::Abandoned(AbandonReason::RetriesExhausted {
                            attempts: attempt + 1,
                        })
                    } else {
                        let delay = self.config.backoff_delay(attempt);
                        warn!(index, attempt = attempt + 1, ?delay, "rate limited, backing off");
                        if pause(delay, deadline).await {
                            BatchState::Pending {
                                attempt: attempt + 1,
                            }
                        } else {
                            BatchState::Abandoned(AbandonReason::Deadline)
                        }
                    }
                }
                Some(Err(err)) => BatchState::Abandoned(AbandonReason::Failed(err)),
            };
        }
    }

    /// Issues one request; `None` if the deadline passed first.
    async fn request(
        &self,
        tokens: &[String],
        deadline: Option<Instant>,
    ) -> Option<crate::error::Result<QuoteBatch>> {
        let call = self
            .source
            .fetch_quotes(self.config.segment, self.config.mode, tokens);
        match deadline {
            Some(deadline) => timeout_at(deadline, call).await.ok(),
            None => Some(call.await),
        }
    }

    fn is_rate_limited(&self, err: &Error) -> bool {
        match err {
            Error::Upstream { code, .. } => *code == self.config.rate_limit_code,
            other => other.is_transient(),
        }
    }
}

/// Sleeps for `delay`, cut short at `deadline`. Returns false if the deadline
/// was reached.
async fn pause(delay: Duration, deadline: Option<Instant>) -> bool {
    let wake = Instant::now() + delay;
    match deadline {
        Some(deadline) if wake >= deadline => {
            sleep_until(deadline).await;
            false
        }
        _ => {
            sleep(delay).await;
            true
        }
    }
}
