//! Greeks calculator.
//!
//! Turns spot, strike, time, rate and either a known volatility or an
//! observed option price into a display-ready [`GreeksResult`].

use super::black_scholes::{BlackScholes, OptionStyle, PricingParams};
use super::iv::{ImpliedVolatility, SolverConfig};
use super::normal::{norm_cdf, norm_pdf};
use crate::utils::{DAYS_PER_YEAR, round_decimal};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decimal places kept for implied volatility (percent).
pub const IV_DECIMALS: u32 = 2;
/// Decimal places kept for delta.
pub const DELTA_DECIMALS: u32 = 4;
/// Decimal places kept for gamma.
pub const GAMMA_DECIMALS: u32 = 6;
/// Decimal places kept for theta.
pub const THETA_DECIMALS: u32 = 2;
/// Decimal places kept for vega.
pub const VEGA_DECIMALS: u32 = 2;

/// Implied volatility and Greeks for one option, rounded for display.
///
/// All fields are zero when the inputs could not be priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GreeksResult {
    /// Implied volatility in percent (25.0 = 25%).
    #[serde(with = "rust_decimal::serde::float")]
    pub implied_volatility: Decimal,
    /// ∂price/∂S, in [0, 1] for calls and [-1, 0] for puts.
    #[serde(with = "rust_decimal::serde::float")]
    pub delta: Decimal,
    /// ∂delta/∂S, never negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub gamma: Decimal,
    /// Price decay per calendar day.
    #[serde(with = "rust_decimal::serde::float")]
    pub theta: Decimal,
    /// Price change per one percentage point of volatility.
    #[serde(with = "rust_decimal::serde::float")]
    pub vega: Decimal,
}

impl GreeksResult {
    /// The all-zero result used for unpriceable inputs.
    pub const ZERO: Self = Self {
        implied_volatility: Decimal::ZERO,
        delta: Decimal::ZERO,
        gamma: Decimal::ZERO,
        theta: Decimal::ZERO,
        vega: Decimal::ZERO,
    };

    /// Returns true if every field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Computes Greeks, solving for implied volatility when it is not known.
#[derive(Debug, Clone, Default)]
pub struct GreeksCalculator {
    solver: ImpliedVolatility,
}

impl GreeksCalculator {
    /// Creates a calculator with the given solver configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            solver: ImpliedVolatility::new(config),
        }
    }

    /// Returns the implied volatility solver.
    #[must_use]
    pub const fn solver(&self) -> &ImpliedVolatility {
        &self.solver
    }

    /// Computes Greeks from an observed option price.
    #[must_use]
    pub fn from_price(&self, params: &PricingParams, observed_price: f64) -> GreeksResult {
        self.compute(params, None, Some(observed_price))
    }

    /// Computes Greeks from a known volatility (decimal).
    #[must_use]
    pub fn from_volatility(&self, params: &PricingParams, sigma: f64) -> GreeksResult {
        self.compute(params, Some(sigma), None)
    }

    /// Computes Greeks.
    ///
    /// `known_sigma` skips the IV solver. Without it, `observed_price` must be
    /// positive. Degenerate inputs, a non-positive volatility, or any
    /// non-finite intermediate value give [`GreeksResult::ZERO`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use option_chain_greeks::pricing::{GreeksCalculator, PricingParams};
    /// use rust_decimal_macros::dec;
    ///
    /// let params = PricingParams::call(100.0, 100.0, 30.0 / 365.0, 0.05);
    /// let greeks = GreeksCalculator::default().from_volatility(&params, 0.25);
    ///
    /// assert_eq!(greeks.implied_volatility, dec!(25));
    /// assert!(greeks.delta > dec!(0.5) && greeks.delta < dec!(0.6));
    /// ```
    #[must_use]
    pub fn compute(
        &self,
        params: &PricingParams,
        known_sigma: Option<f64>,
        observed_price: Option<f64>,
    ) -> GreeksResult {
        if params.is_degenerate() {
            return GreeksResult::ZERO;
        }

        let sigma = match (known_sigma, observed_price) {
            (Some(sigma), _) => sigma,
            (None, Some(price)) if price > 0.0 => self.solver.solve(price, params),
            (None, _) => return GreeksResult::ZERO,
        };
        if !(sigma > 0.0) {
            return GreeksResult::ZERO;
        }

        // A volatility Decimal cannot hold is as unusable as a non-finite Greek.
        let implied_volatility = Decimal::from_f64(sigma * 100.0)
            .map(|iv| iv.round_dp(IV_DECIMALS).normalize());

        match implied_volatility.zip(raw_greeks(params, sigma)) {
            Some((implied_volatility, raw)) => GreeksResult {
                implied_volatility,
                delta: round_decimal(raw.delta, DELTA_DECIMALS),
                gamma: round_decimal(raw.gamma, GAMMA_DECIMALS),
                theta: round_decimal(raw.theta, THETA_DECIMALS),
                vega: round_decimal(raw.vega, VEGA_DECIMALS),
            },
            None => {
                warn!(
                    spot = params.spot,
                    strike = params.strike,
                    time_to_expiry = params.time_to_expiry,
                    sigma,
                    "unrepresentable IV or Greeks, returning zero"
                );
                GreeksResult::ZERO
            }
        }
    }
}

struct RawGreeks {
    delta: f64,
    gamma: f64,
    theta: f64,
    vega: f64,
}

fn raw_greeks(params: &PricingParams, sigma: f64) -> Option<RawGreeks> {
    let sqrt_t = params.time_to_expiry.sqrt();
    let d1 = BlackScholes::d1(params, sigma);
    let d2 = BlackScholes::d2(d1, sigma, params.time_to_expiry);
    let pdf_d1 = norm_pdf(d1);
    let carry = params.risk_free_rate * params.strike * params.discount_factor();

    let decay = -(params.spot * pdf_d1 * sigma) / (2.0 * sqrt_t);
    let (delta, theta) = match params.style {
        OptionStyle::Call => (norm_cdf(d1), decay - carry * norm_cdf(d2)),
        OptionStyle::Put => (norm_cdf(d1) - 1.0, decay + carry * norm_cdf(-d2)),
    };

    let raw = RawGreeks {
        delta,
        gamma: pdf_d1 / (params.spot * sigma * sqrt_t),
        theta: theta / DAYS_PER_YEAR,
        vega: params.spot * pdf_d1 * sqrt_t / 100.0,
    };

    [raw.delta, raw.gamma, raw.theta, raw.vega]
        .iter()
        .all(|v| v.is_finite())
        .then_some(raw)
}
