//! Benchmarks for option-chain-greeks library.
//!
//! - **pricing_bench**: Black-Scholes price, IV strategies and Greeks
//! - **window_bench**: Strike window selection and ATM lookup


use criterion::{criterion_group, criterion_main};

// Pricing and Greeks benchmarks
criterion_group!(
    pricing_benches,
    pricing_bench::pricing_operations,
    pricing_bench::greeks_scaling,
);

// Strike window benchmarks
criterion_group!(window_benches, window_bench::window_scaling);

criterion_main!(pricing_benches, window_benches);
