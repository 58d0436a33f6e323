//! Integration tests for the pricing module.

use option_chain_greeks::pricing::{
    Bisection, BlackScholes, GreeksCalculator, GreeksResult, ImpliedVolatility, IvStrategy,
    NewtonRaphson, OptionStyle, PricingParams, SolverConfig,
};
use rust_decimal::Decimal;

const RATE: f64 = 0.0525;

fn grid() -> Vec<PricingParams> {
    let mut params = Vec::new();
    for strike in [90.0, 100.0, 110.0] {
        for t in [0.25, 1.0] {
            for style in [OptionStyle::Call, OptionStyle::Put] {
                params.push(PricingParams::new(100.0, strike, t, RATE, style));
            }
        }
    }
    params
}

#[test]
fn test_iv_round_trip() {
    let solver = ImpliedVolatility::default();

    for params in grid() {
        for sigma in [0.1, 0.25, 0.5, 1.0, 2.0] {
            let price = BlackScholes::price(&params, sigma);
            let iv = solver.solve(price, &params);
            assert!(
                (iv - sigma).abs() < 1e-4,
                "{params:?} sigma={sigma} price={price} iv={iv}"
            );
        }
    }
}

#[test]
fn test_iv_round_trip_low_vol_atm() {
    let solver = ImpliedVolatility::default();
    for style in [OptionStyle::Call, OptionStyle::Put] {
        let params = PricingParams::new(100.0, 100.0, 1.0, RATE, style);
        let price = BlackScholes::price(&params, 0.05);
        assert!((solver.solve(price, &params) - 0.05).abs() < 1e-4);
    }
}

#[test]
fn test_strategies_agree() {
    let config = SolverConfig::default();
    let params = PricingParams::put(2450.0, 2400.0, 30.0 / 365.0, RATE);
    let price = BlackScholes::price(&params, 0.32);

    let newton = NewtonRaphson.solve(&params, price, &config).unwrap();
    let bisection = Bisection.solve(&params, price, &config).unwrap();

    assert!((newton.volatility - 0.32).abs() < 1e-4);
    assert!((bisection.volatility - 0.32).abs() < 1e-4);
    assert!(newton.iterations < bisection.iterations);
}

#[test]
fn test_greeks_bounds() {
    let calculator = GreeksCalculator::default();

    for params in grid() {
        for sigma in [0.05, 0.2, 0.6, 1.5] {
            let greeks = calculator.from_volatility(&params, sigma);
            match params.style {
                OptionStyle::Call => {
                    assert!(greeks.delta >= Decimal::ZERO && greeks.delta <= Decimal::ONE);
                }
                OptionStyle::Put => {
                    assert!(greeks.delta >= -Decimal::ONE && greeks.delta <= Decimal::ZERO);
                }
            }
            assert!(greeks.gamma >= Decimal::ZERO, "{params:?} {greeks:?}");
            assert!(greeks.vega >= Decimal::ZERO, "{params:?} {greeks:?}");
        }
    }
}

#[test]
fn test_degenerate_inputs() {
    let calculator = GreeksCalculator::default();

    let zero_spot = PricingParams::call(0.0, 100.0, 0.5, RATE);
    let zero_strike = PricingParams::call(100.0, 0.0, 0.5, RATE);
    let expired = PricingParams::put(100.0, 100.0, 0.0, RATE);
    for params in [zero_spot, zero_strike, expired] {
        assert_eq!(calculator.from_price(&params, 5.0), GreeksResult::ZERO);
        assert_eq!(calculator.from_volatility(&params, 0.3), GreeksResult::ZERO);
    }

    let params = PricingParams::call(100.0, 100.0, 0.5, RATE);
    assert_eq!(ImpliedVolatility::default().solve(0.0, &params), 0.0);
    assert_eq!(calculator.from_price(&params, 0.0), GreeksResult::ZERO);
    assert_eq!(calculator.compute(&params, None, None), GreeksResult::ZERO);
}

#[test]
fn test_price_below_intrinsic_is_unpriceable() {
    let params = PricingParams::call(120.0, 100.0, 0.5, RATE);
    assert!(params.intrinsic_floor() > 20.0);
    assert_eq!(ImpliedVolatility::default().solve(15.0, &params), 0.0);
    assert!(GreeksCalculator::default().from_price(&params, 15.0).is_zero());
}

#[test]
fn test_greeks_idempotent() {
    let calculator = GreeksCalculator::default();
    let params = PricingParams::call(1510.0, 1500.0, 14.0 / 365.0, RATE);

    let first = calculator.from_price(&params, 28.0);
    let second = calculator.from_price(&params, 28.0);
    assert_eq!(first, second);
    assert!(!first.is_zero());
}
