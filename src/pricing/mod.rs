//! Black-Scholes pricing, implied volatility and Greeks.
//!
//! ## Components
//!
//! - [`norm_cdf`] / [`norm_pdf`]: standard normal primitives
//! - [`BlackScholes`]: closed-form European price and raw vega
//! - [`ImpliedVolatility`]: Newton-Raphson with a bisection fallback, both
//!   behind the [`IvStrategy`] trait
//! - [`GreeksCalculator`]: IV, delta, gamma, theta and vega as a rounded
//!   [`GreeksResult`]
//!
//! Every function here is pure and never fails: degenerate inputs resolve to
//! zero values.
//!
//! ## Example
//!
//! ```rust
//! use option_chain_greeks::pricing::{GreeksCalculator, PricingParams, DEFAULT_RISK_FREE_RATE};
//!
//! let params = PricingParams::put(2450.0, 2400.0, 14.0 / 365.0, DEFAULT_RISK_FREE_RATE);
//! let greeks = GreeksCalculator::default().from_price(&params, 22.5);
//!
//! assert!(greeks.implied_volatility > rust_decimal::Decimal::ZERO);
//! assert!(greeks.delta.is_sign_negative());
//! ```

mod black_scholes;
mod greeks;
mod iv;
mod normal;

pub use black_scholes::{BlackScholes, OptionStyle, PricingParams};
pub use greeks::{
    DELTA_DECIMALS, GAMMA_DECIMALS, GreeksCalculator, GreeksResult, IV_DECIMALS, THETA_DECIMALS,
    VEGA_DECIMALS,
};
pub use iv::{
    Bisection, ImpliedVolatility, IvError, IvSolution, IvStrategy, NewtonRaphson, SolverConfig,
    brenner_subrahmanyam,
};
pub use normal::{norm_cdf, norm_pdf};

/// Default annualized risk-free rate (RBI repo rate, 5.25%).
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.0525;
