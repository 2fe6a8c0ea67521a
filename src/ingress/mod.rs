//! Ingress adapters — the external collaborators spec §6 describes as
//! "market metadata", "order-book stream" and "volatility stats"
//! inbound interfaces. Each adapter owns exactly one symbol's write
//! path into the `OrderBookCache` (single-writer-per-symbol, spec §5).

pub mod binance;
pub mod metadata;

pub use metadata::{MetadataProvider, StaticMetadataProvider};
