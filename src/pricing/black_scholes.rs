//! Black-Scholes pricing for European options.
//!
//! Prices and raw partial derivatives used by the implied volatility solver
//! and the Greeks calculator. Volatility is always a decimal here
//! (0.25 = 25%).

use super::normal::{norm_cdf, norm_pdf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionStyle {
    /// Call option (right to buy the underlying at strike price).
    Call,
    /// Put option (right to sell the underlying at strike price).
    Put,
}

impl OptionStyle {
    /// Detects the side from an exchange trading symbol ending in `CE` or `PE`.
    ///
    /// ```rust
    /// use option_chain_greeks::pricing::OptionStyle;
    ///
    /// assert_eq!(OptionStyle::from_symbol("RELIANCE24FEB261500CE"), Some(OptionStyle::Call));
    /// assert_eq!(OptionStyle::from_symbol("RELIANCE24FEB261500PE"), Some(OptionStyle::Put));
    /// assert_eq!(OptionStyle::from_symbol("RELIANCE-EQ"), None);
    /// ```
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim_end();
        if symbol.ends_with("CE") {
            Some(Self::Call)
        } else if symbol.ends_with("PE") {
            Some(Self::Put)
        } else {
            None
        }
    }

    /// Exchange suffix for this side.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }
}

impl fmt::Display for OptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Contract and market inputs shared by pricing, IV and Greeks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingParams {
    /// Underlying spot price (S).
    pub spot: f64,
    /// Strike price (K) in the same units as spot.
    pub strike: f64,
    /// Time to expiration in years (T).
    pub time_to_expiry: f64,
    /// Annualized risk-free rate (r), e.g. 0.0525.
    pub risk_free_rate: f64,
    /// Call or put.
    pub style: OptionStyle,
}

impl PricingParams {
    /// Creates new pricing parameters.
    #[must_use]
    pub const fn new(
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        style: OptionStyle,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            risk_free_rate,
            style,
        }
    }

    /// Creates parameters for a call option.
    #[must_use]
    pub const fn call(spot: f64, strike: f64, time_to_expiry: f64, risk_free_rate: f64) -> Self {
        Self::new(spot, strike, time_to_expiry, risk_free_rate, OptionStyle::Call)
    }

    /// Creates parameters for a put option.
    #[must_use]
    pub const fn put(spot: f64, strike: f64, time_to_expiry: f64, risk_free_rate: f64) -> Self {
        Self::new(spot, strike, time_to_expiry, risk_free_rate, OptionStyle::Put)
    }

    /// Returns true when the model is undefined for these inputs
    /// (non-positive spot, strike or time, or any NaN).
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.spot > 0.0 && self.strike > 0.0 && self.time_to_expiry > 0.0)
    }

    /// Discount factor `e^(−rT)`.
    #[must_use]
    pub fn discount_factor(&self) -> f64 {
        (-self.risk_free_rate * self.time_to_expiry).exp()
    }

    /// Lower arbitrage bound on the option price.
    ///
    /// Calls: `max(S − K·e^(−rT), 0)`. Puts: `max(K·e^(−rT) − S, 0)`.
    #[must_use]
    pub fn intrinsic_floor(&self) -> f64 {
        let discounted_strike = self.strike * self.discount_factor();
        match self.style {
            OptionStyle::Call => (self.spot - discounted_strike).max(0.0),
            OptionStyle::Put => (discounted_strike - self.spot).max(0.0),
        }
    }

    /// Returns a copy with a different side.
    #[must_use]
    pub const fn with_style(mut self, style: OptionStyle) -> Self {
        self.style = style;
        self
    }
}

/// Black-Scholes pricing model.
pub struct BlackScholes;

impl BlackScholes {
    /// d1 = [ln(S/K) + (r + σ²/2)T] / (σ√T)
    #[must_use]
    pub fn d1(params: &PricingParams, vol: f64) -> f64 {
        let t = params.time_to_expiry;
        ((params.spot / params.strike).ln() + (params.risk_free_rate + 0.5 * vol * vol) * t)
            / (vol * t.sqrt())
    }

    /// d2 = d1 − σ√T
    #[must_use]
    pub fn d2(d1: f64, vol: f64, time_to_expiry: f64) -> f64 {
        d1 - vol * time_to_expiry.sqrt()
    }

    /// Theoretical option price.
    ///
    /// For calls: C = S·Φ(d1) − K·e^(−rT)·Φ(d2)
    /// For puts:  P = K·e^(−rT)·Φ(−d2) − S·Φ(−d1)
    ///
    /// Returns 0 when `T`, `σ`, `S` or `K` is non-positive. A zero price means
    /// "unpriceable", not a market price of zero.
    ///
    /// ```rust
    /// use option_chain_greeks::pricing::{BlackScholes, PricingParams};
    ///
    /// let params = PricingParams::call(100.0, 100.0, 1.0, 0.05);
    /// let price = BlackScholes::price(&params, 0.2);
    /// assert!((price - 10.4506).abs() < 1e-4);
    /// ```
    #[must_use]
    pub fn price(params: &PricingParams, vol: f64) -> f64 {
        if params.is_degenerate() || !(vol > 0.0) {
            return 0.0;
        }

        let d1 = Self::d1(params, vol);
        let d2 = Self::d2(d1, vol, params.time_to_expiry);
        let discounted_strike = params.strike * params.discount_factor();

        match params.style {
            OptionStyle::Call => params.spot * norm_cdf(d1) - discounted_strike * norm_cdf(d2),
            OptionStyle::Put => discounted_strike * norm_cdf(-d2) - params.spot * norm_cdf(-d1),
        }
    }

    /// Raw vega, `∂price/∂σ = S·φ(d1)·√T`, per unit of volatility.
    ///
    /// Side-independent and never negative. Returns 0 for degenerate inputs.
    #[must_use]
    pub fn vega(params: &PricingParams, vol: f64) -> f64 {
        if params.is_degenerate() || !(vol > 0.0) {
            return 0.0;
        }
        let d1 = Self::d1(params, vol);
        params.spot * norm_pdf(d1) * params.time_to_expiry.sqrt()
    }
}
