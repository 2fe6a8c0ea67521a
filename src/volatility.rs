//! Volatility Cache — recent-return sigma per symbol (spec §4.3).
//!
//! Structurally identical to the order-book cache's outer map but far
//! lower churn: one write per inbound volatility-stats message, many
//! reads per scan tick. A plain `parking_lot::RwLock<HashMap<..>>` is
//! sufficient — no ArcSwap hot path is needed since readers tolerate a
//! short critical section here (unlike the per-tick order-book reads).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::models::VolatilityEntry;
use crate::orderbook_cache::SymbolKey;

#[derive(Default)]
pub struct VolatilityCache {
    entries: RwLock<HashMap<SymbolKey, VolatilityEntry>>,
}

impl VolatilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, key: SymbolKey, entry: VolatilityEntry) {
        self.entries.write().insert(key, entry);
    }

    pub fn get(&self, key: &SymbolKey) -> Option<VolatilityEntry> {
        self.entries.read().get(key).copied()
    }

    /// Per spec §4.6: when a cycle spans legs with differing volatility,
    /// the worst (largest) sigma governs the combined risk adjustment.
    /// A symbol with no entry, or whose entry is older than
    /// `max_age`, contributes `fallback_sigma` instead (spec §4.3) —
    /// the conservative choice, not zero.
    pub fn worst_of(
        &self,
        keys: &[SymbolKey],
        fallback_sigma: f64,
        max_age: Duration,
        now: Instant,
    ) -> f64 {
        keys.iter()
            .map(|k| match self.get(k) {
                Some(entry) if now.saturating_duration_since(entry.last_updated) <= max_age => {
                    entry.sigma
                }
                _ => fallback_sigma,
            })
            .fold(0.0_f64, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_of_takes_max_sigma() {
        let cache = VolatilityCache::new();
        let a: SymbolKey = ("binance".into(), "BTCUSDT".into());
        let b: SymbolKey = ("binance".into(), "ETHUSDT".into());
        let now = Instant::now();
        cache.update(
            a.clone(),
            VolatilityEntry {
                sigma: 0.01,
                window_samples: 100,
                last_updated: now,
            },
        );
        cache.update(
            b.clone(),
            VolatilityEntry {
                sigma: 0.05,
                window_samples: 100,
                last_updated: now,
            },
        );
        assert_eq!(
            cache.worst_of(&[a, b], 0.02, Duration::from_secs(60), now),
            0.05
        );
    }

    #[test]
    fn missing_symbol_contributes_fallback_sigma() {
        let cache = VolatilityCache::new();
        let unknown: SymbolKey = ("binance".into(), "XRPUSDT".into());
        assert_eq!(
            cache.worst_of(&[unknown], 0.02, Duration::from_secs(60), Instant::now()),
            0.02
        );
    }

    #[test]
    fn expired_entry_falls_back() {
        let cache = VolatilityCache::new();
        let key: SymbolKey = ("binance".into(), "BTCUSDT".into());
        let stale_at = Instant::now();
        cache.update(
            key.clone(),
            VolatilityEntry {
                sigma: 0.09,
                window_samples: 100,
                last_updated: stale_at,
            },
        );
        let later = stale_at + Duration::from_secs(120);
        assert_eq!(
            cache.worst_of(&[key], 0.02, Duration::from_secs(60), later),
            0.02
        );
    }
}
