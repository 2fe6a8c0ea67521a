//! Cross-exchange and triangular arbitrage scanner for crypto spot
//! markets.
//!
//! Core pipeline: a `MarketRegistry` of tradeable markets feeds a
//! `MarketGraph`, whose cycles are enumerated once by `enumerator` and
//! re-evaluated every tick by `Scanner` against the live
//! `OrderBookCache` and `VolatilityCache`, delivering qualifying
//! opportunities through an `OpportunitySink`.

pub mod config;
pub mod enumerator;
pub mod evaluator;
pub mod graph;
pub mod ingress;
pub mod models;
pub mod orderbook_cache;
pub mod registry;
pub mod scanner;
pub mod sink;
pub mod volatility;

pub use config::Config;
pub use graph::MarketGraph;
pub use orderbook_cache::OrderBookCache;
pub use registry::MarketRegistry;
pub use scanner::{ScanStats, Scanner};
pub use sink::OpportunitySink;
pub use volatility::VolatilityCache;
