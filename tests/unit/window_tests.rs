//! Integration tests for strike window selection.

use option_chain_greeks::chain::{atm_strike, normalize_strike, select_window};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const STRIKES: [i32; 7] = [100, 150, 200, 250, 300, 350, 400];

#[test]
fn test_window_around_atm_between_strikes() {
    // Insertion point of 225 is index 3 (250); ±2 spans indices 1..=5.
    assert_eq!(select_window(&STRIKES, 225, 2), &[150, 200, 250, 300, 350]);
}

#[test]
fn test_window_exact_strike_is_center() {
    assert_eq!(select_window(&STRIKES, 300, 2), &[200, 250, 300, 350, 400]);
}

#[test]
fn test_window_is_contiguous_and_bounded() {
    for atm in (0..=500).step_by(25) {
        for radius in 0..5 {
            let window = select_window(&STRIKES, atm, radius);
            assert!(!window.is_empty());
            assert!(window.len() <= 2 * radius + 1);
            assert!(window.windows(2).all(|w| w[0] < w[1]));

            let start = STRIKES.iter().position(|s| *s == window[0]).unwrap();
            assert_eq!(&STRIKES[start..start + window.len()], window);
        }
    }
}

#[test]
fn test_window_on_normalized_strikes() {
    let strikes: Vec<Decimal> = [2_380_000, 2_390_000, 2_400_000, 2_410_000, 2_420_000]
        .into_iter()
        .map(|raw| normalize_strike(Decimal::from(raw), 2))
        .collect();

    let window = select_window(&strikes, dec!(24012.35), 1);
    assert_eq!(window, &[dec!(24000), dec!(24100), dec!(24200)]);
    assert_eq!(atm_strike(&strikes, dec!(24012.35)).unwrap(), dec!(24000));
}
