//! Integration tests for option-chain-greeks.

mod chain_tests;
mod fetcher_tests;
mod pricing_tests;
mod window_tests;
