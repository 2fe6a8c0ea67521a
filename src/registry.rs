//! Market Registry — the immutable-after-init descriptor store (spec §4.1).
//!
//! Registration validates each descriptor and rejects duplicate
//! (exchange_id, symbol) keys; after startup the registry is read-only
//! and cheaply cloneable behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;

use crate::models::MarketDescriptor;

#[derive(Default)]
pub struct MarketRegistry {
    markets: RwLock<HashMap<(String, String), Arc<MarketDescriptor>>>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and inserts a descriptor. Fatal (per §7) on invariant
    /// violation or duplicate key — callers at startup should propagate
    /// the error with `?`.
    pub fn register(&self, descriptor: MarketDescriptor) -> Result<Arc<MarketDescriptor>> {
        descriptor.validate().map_err(|e| anyhow!(e))?;
        let key = descriptor.key();
        let mut markets = self.markets.write();
        if markets.contains_key(&key) {
            return Err(anyhow!(
                "duplicate market registration: {}/{}",
                key.0,
                key.1
            ));
        }
        let descriptor = Arc::new(descriptor);
        markets.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    pub fn get(&self, exchange_id: &str, symbol: &str) -> Option<Arc<MarketDescriptor>> {
        self.markets
            .read()
            .get(&(exchange_id.to_string(), symbol.to_string()))
            .cloned()
    }

    pub fn all(&self) -> Vec<Arc<MarketDescriptor>> {
        self.markets.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.markets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Asset;
    use rust_decimal_macros::dec;

    fn market(exchange: &str, symbol: &str) -> MarketDescriptor {
        MarketDescriptor {
            exchange_id: exchange.into(),
            symbol: symbol.into(),
            base: Asset::new("BTC"),
            quote: Asset::new("USDT"),
            taker_fee: dec!(0.001),
            min_notional_quote: dec!(10),
            price_tick: dec!(0.01),
            qty_tick: dec!(0.00001),
        }
    }

    #[test]
    fn rejects_duplicate_registration() {
        let registry = MarketRegistry::new();
        registry.register(market("binance", "BTCUSDT")).unwrap();
        assert!(registry.register(market("binance", "BTCUSDT")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_invalid_descriptor() {
        let registry = MarketRegistry::new();
        let mut bad = market("binance", "BTCUSDT");
        bad.price_tick = dec!(0);
        assert!(registry.register(bad).is_err());
        assert!(registry.is_empty());
    }
}
