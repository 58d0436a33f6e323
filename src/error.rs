//! Error types for the option chain library.
//!
//! All fallible chain-assembly operations return [`Result<T>`]. The pricing
//! layer never fails: degenerate inputs resolve to zero values instead.

use thiserror::Error;

/// Result type alias using the library [`enum@Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling an option chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Nothing matched the request.
    #[error("no data available: {0}")]
    NoDataAvailable(String),

    /// The underlying has no option instruments in the universe.
    #[error("no option instruments found for {0}")]
    InstrumentNotFound(String),

    /// The requested expiry has no instruments.
    #[error("expiry not found: {0}")]
    ExpiryNotFound(String),

    /// An upstream instrument record could not be decoded.
    #[error("invalid instrument {token}: {reason}")]
    InvalidInstrument {
        /// Exchange token of the offending record.
        token: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An expiry string could not be parsed.
    #[error("invalid expiry '{0}'")]
    InvalidExpiry(String),

    /// The quote source reported a machine-readable error.
    #[error("upstream error {code}: {message}")]
    Upstream {
        /// Upstream error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The quote source rejected the request for exceeding its rate limit.
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    /// The request never produced a response envelope.
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Creates a `NoDataAvailable` error.
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::NoDataAvailable(message.into())
    }

    /// Creates an `InstrumentNotFound` error.
    pub fn instrument_not_found(underlying: impl Into<String>) -> Self {
        Self::InstrumentNotFound(underlying.into())
    }

    /// Creates an `ExpiryNotFound` error.
    pub fn expiry_not_found(expiry: impl Into<String>) -> Self {
        Self::ExpiryNotFound(expiry.into())
    }

    /// Creates an `InvalidInstrument` error.
    pub fn invalid_instrument(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Upstream` error.
    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a `Transport` error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed payload: {err}"))
    }
}
