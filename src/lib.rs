//! coincal library
//!
//! Cache-backed access to the CoinMarketCal events API, plus the pieces the
//! binary uses to parse arguments and print results.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod lookup;
pub mod table;
