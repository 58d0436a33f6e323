//! Implied volatility solver.
//!
//! Two independent root-finding strategies implement [`IvStrategy`]:
//! [`NewtonRaphson`] (fast, needs a usable vega) and [`Bisection`]
//! (slow, always brackets the root because the Black-Scholes price is
//! monotonic in volatility). [`ImpliedVolatility`] runs the primary strategy
//! and switches to the fallback when it receives [`IvError`].

use super::black_scholes::{BlackScholes, PricingParams};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

/// Why a strategy gave up.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IvError {
    /// Tolerance was not reached, or the iteration hit a flat vega region.
    #[error("solver did not converge after {iterations} iterations, last IV: {last_estimate:.6}")]
    NotConverged {
        /// Iterations performed.
        iterations: u32,
        /// Best estimate when the strategy stopped.
        last_estimate: f64,
    },

    /// Price or vega evaluated to NaN or infinity.
    #[error("non-finite value at iteration {iteration}")]
    NonFinite {
        /// Iteration at which the value appeared.
        iteration: u32,
    },
}

/// Converged volatility with the work it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvSolution {
    /// Volatility as a decimal (0.25 = 25%).
    pub volatility: f64,
    /// Iterations used.
    pub iterations: u32,
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Maximum iterations per strategy.
    pub max_iterations: u32,
    /// Absolute price difference accepted as converged.
    pub tolerance: f64,
    /// Vega below which a Newton step is not trusted.
    pub min_vega: f64,
    /// Lower volatility bound (default: 0.001 = 0.1%).
    pub min_vol: f64,
    /// Upper volatility bound (default: 5.0 = 500%).
    pub max_vol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            min_vega: 1e-10,
            min_vol: 0.001,
            max_vol: 5.0,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the volatility bounds, in either order.
    ///
    /// Non-finite or non-positive bounds are ignored and the current ones kept.
    #[must_use]
    pub fn with_bounds(mut self, min_vol: f64, max_vol: f64) -> Self {
        let valid = |vol: f64| vol.is_finite() && vol > 0.0;
        if valid(min_vol) && valid(max_vol) {
            self.min_vol = min_vol.min(max_vol);
            self.max_vol = min_vol.max(max_vol);
        }
        self
    }

    // Fields are public, so this must not panic on a reversed or NaN pair.
    fn clamp(&self, vol: f64) -> f64 {
        vol.max(self.min_vol).min(self.max_vol)
    }
}

/// A root-finding strategy for implied volatility.
///
/// Callers guarantee non-degenerate params and a positive market price
/// at or above the intrinsic floor.
pub trait IvStrategy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Finds σ such that the model price matches `market_price`.
    ///
    /// # Errors
    ///
    /// Returns [`IvError`] when the strategy cannot produce a converged answer.
    fn solve(
        &self,
        params: &PricingParams,
        market_price: f64,
        config: &SolverConfig,
    ) -> Result<IvSolution, IvError>;
}

/// Brenner-Subrahmanyam seed: `σ₀ = √(2π/T) · (price / S)`.
#[must_use]
pub fn brenner_subrahmanyam(params: &PricingParams, market_price: f64) -> f64 {
    (2.0 * PI / params.time_to_expiry).sqrt() * (market_price / params.spot)
}

/// Newton-Raphson iteration seeded with the Brenner-Subrahmanyam approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonRaphson;

impl IvStrategy for NewtonRaphson {
    fn name(&self) -> &'static str {
        "newton-raphson"
    }

    fn solve(
        &self,
        params: &PricingParams,
        market_price: f64,
        config: &SolverConfig,
    ) -> Result<IvSolution, IvError> {
        let mut vol = config.clamp(brenner_subrahmanyam(params, market_price));
        if !vol.is_finite() {
            return Err(IvError::NonFinite { iteration: 0 });
        }

        for iteration in 0..config.max_iterations {
            let diff = BlackScholes::price(params, vol) - market_price;
            if !diff.is_finite() {
                return Err(IvError::NonFinite { iteration });
            }
            if diff.abs() < config.tolerance {
                return Ok(IvSolution {
                    volatility: vol,
                    iterations: iteration + 1,
                });
            }

            let vega = BlackScholes::vega(params, vol);
            if !vega.is_finite() {
                return Err(IvError::NonFinite { iteration });
            }
            if vega < config.min_vega {
                return Err(IvError::NotConverged {
                    iterations: iteration + 1,
                    last_estimate: vol,
                });
            }

            vol = config.clamp(vol - diff / vega);
        }

        Err(IvError::NotConverged {
            iterations: config.max_iterations,
            last_estimate: vol,
        })
    }
}

/// Bisection on `[min_vol, max_vol]`.
///
/// When the tolerance is not reached the error carries the final midpoint,
/// which is still the best available estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bisection;

impl IvStrategy for Bisection {
    fn name(&self) -> &'static str {
        "bisection"
    }

    fn solve(
        &self,
        params: &PricingParams,
        market_price: f64,
        config: &SolverConfig,
    ) -> Result<IvSolution, IvError> {
        let mut low = config.min_vol;
        let mut high = config.max_vol;

        for iteration in 0..config.max_iterations {
            let mid = 0.5 * (low + high);
            let price = BlackScholes::price(params, mid);

            if (price - market_price).abs() < config.tolerance {
                return Ok(IvSolution {
                    volatility: mid,
                    iterations: iteration + 1,
                });
            }

            if price > market_price {
                high = mid;
            } else {
                low = mid;
            }
        }

        Err(IvError::NotConverged {
            iterations: config.max_iterations,
            last_estimate: 0.5 * (low + high),
        })
    }
}

/// Implied volatility façade: primary strategy with a fallback.
///
/// Never fails. Degenerate inputs and prices below the intrinsic floor give
/// 0; otherwise the result is a finite volatility inside the configured bounds.
///
/// # Example
///
/// ```rust
/// use option_chain_greeks::pricing::{BlackScholes, ImpliedVolatility, PricingParams};
///
/// let params = PricingParams::call(100.0, 100.0, 0.25, 0.05);
/// let price = BlackScholes::price(&params, 0.3);
///
/// let iv = ImpliedVolatility::default().solve(price, &params);
/// assert!((iv - 0.3).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct ImpliedVolatility<P = NewtonRaphson, F = Bisection> {
    config: SolverConfig,
    primary: P,
    fallback: F,
}

impl ImpliedVolatility {
    /// Creates a Newton-Raphson solver with bisection fallback.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self::with_strategies(config, NewtonRaphson, Bisection)
    }
}

impl Default for ImpliedVolatility {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<P: IvStrategy, F: IvStrategy> ImpliedVolatility<P, F> {
    /// Creates a solver from explicit strategies.
    #[must_use]
    pub const fn with_strategies(config: SolverConfig, primary: P, fallback: F) -> Self {
        Self {
            config,
            primary,
            fallback,
        }
    }

    /// Returns the solver configuration.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves for the volatility (decimal) implied by `market_price`.
    #[must_use]
    pub fn solve(&self, market_price: f64, params: &PricingParams) -> f64 {
        if !(market_price > 0.0) || params.is_degenerate() {
            return 0.0;
        }

        let floor = params.intrinsic_floor();
        if market_price < floor {
            debug!(
                market_price,
                floor,
                strike = params.strike,
                "price below intrinsic floor"
            );
            return 0.0;
        }

        match self.primary.solve(params, market_price, &self.config) {
            Ok(solution) => return solution.volatility,
            Err(err) => debug!(
                strategy = self.primary.name(),
                fallback = self.fallback.name(),
                %err,
                "primary IV strategy failed"
            ),
        }

        match self.fallback.solve(params, market_price, &self.config) {
            Ok(solution) => solution.volatility,
            Err(IvError::NotConverged { last_estimate, .. }) if last_estimate.is_finite() => {
                last_estimate
            }
            Err(err) => {
                debug!(strategy = self.fallback.name(), %err, "fallback IV strategy failed");
                0.0
            }
        }
    }
}
