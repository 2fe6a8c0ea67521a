//! Core data model for the arbitrage scanner.
//!
//! Assets, market descriptors, directed edges, order-book snapshots,
//! cycles and evaluation records. Prices and quantities use
//! `rust_decimal::Decimal` throughout — binary floats lose precision at
//! the 10^-4 margin / 10^8 notional scale this system compares against.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A symbolic currency identifier (e.g. "BTC"). Case-normalized on
/// construction so equality is identifier equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset(pub String);

impl Asset {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Asset {
    fn from(value: &str) -> Self {
        Asset::new(value)
    }
}

/// Which direction a market's edge trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Spend quote, receive base — lifts the asks.
    Buy,
    /// Spend base, receive quote — hits the bids.
    Sell,
}

/// Immutable-after-registration descriptor for a tradeable market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub exchange_id: String,
    pub symbol: String,
    pub base: Asset,
    pub quote: Asset,
    /// Fraction, e.g. 0.001 for 10 bps.
    pub taker_fee: Decimal,
    pub min_notional_quote: Decimal,
    pub price_tick: Decimal,
    pub qty_tick: Decimal,
}

impl MarketDescriptor {
    /// Valid iff base != quote, fee in [0, 1), ticks > 0.
    pub fn validate(&self) -> Result<(), String> {
        if self.base == self.quote {
            return Err(format!(
                "{}/{}: base and quote must differ",
                self.exchange_id, self.symbol
            ));
        }
        if self.taker_fee < Decimal::ZERO || self.taker_fee >= Decimal::ONE {
            return Err(format!(
                "{}/{}: taker_fee {} out of [0, 1)",
                self.exchange_id, self.symbol, self.taker_fee
            ));
        }
        if self.price_tick <= Decimal::ZERO || self.qty_tick <= Decimal::ZERO {
            return Err(format!(
                "{}/{}: price_tick/qty_tick must be > 0",
                self.exchange_id, self.symbol
            ));
        }
        Ok(())
    }

    /// Key used by the registry and order-book cache.
    pub fn key(&self) -> (String, String) {
        (self.exchange_id.clone(), self.symbol.clone())
    }
}

/// A directed edge in the market graph. Every registered market
/// contributes a BUY and a SELL edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub side: Side,
    pub market: Arc<MarketDescriptor>,
    pub from_asset: Asset,
    pub to_asset: Asset,
}

impl Edge {
    pub fn for_market(market: Arc<MarketDescriptor>, side: Side) -> Self {
        let (from_asset, to_asset) = match side {
            Side::Buy => (market.quote.clone(), market.base.clone()),
            Side::Sell => (market.base.clone(), market.quote.clone()),
        };
        Self {
            side,
            market,
            from_asset,
            to_asset,
        }
    }

    /// Stable identity for cycle canonicalization and same-market dedup.
    pub fn edge_id(&self) -> (String, String, Side) {
        (
            self.market.exchange_id.clone(),
            self.market.symbol.clone(),
            self.side,
        )
    }
}

/// One (price, quantity) level on one side of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub qty: Decimal,
}

/// A point-in-time view of an order book's top-N levels on both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub exchange_id: String,
    pub symbol: String,
    /// Descending by price.
    pub bids: Vec<Level>,
    /// Ascending by price.
    pub asks: Vec<Level>,
    pub sequence_no: u64,
    #[serde(skip, default = "Instant::now")]
    pub last_updated: Instant,
}

impl OrderBookSnapshot {
    pub fn empty(exchange_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            sequence_no: 0,
            last_updated: Instant::now(),
        }
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first().copied()
    }

    /// True when the book is internally consistent: sorted, positive
    /// quantities, and not crossed.
    pub fn is_well_formed(&self) -> bool {
        let bids_sorted = self.bids.windows(2).all(|w| w[0].price > w[1].price);
        let asks_sorted = self.asks.windows(2).all(|w| w[0].price < w[1].price);
        let positive = self
            .bids
            .iter()
            .chain(self.asks.iter())
            .all(|l| l.qty > Decimal::ZERO);
        let crossed = match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => b.price >= a.price,
            _ => false,
        };
        bids_sorted && asks_sorted && positive && !crossed
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_updated)
    }
}

/// An ordered, closed walk through the market graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub edges: Vec<Edge>,
}

impl Cycle {
    pub fn start_asset(&self) -> Option<&Asset> {
        self.edges.first().map(|e| &e.from_asset)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Canonical identity: the sequence of edge ids, used to deduplicate
    /// rotations of the same cycle.
    pub fn canonical_id(&self) -> Vec<(String, String, Side)> {
        self.edges.iter().map(Edge::edge_id).collect()
    }

    /// Rotate so the cycle starts at `root` if present among its
    /// vertices; no-op if `root` is never visited.
    pub fn rotate_to_start(&mut self, root: &Asset) {
        if let Some(pos) = self.edges.iter().position(|e| &e.from_asset == root) {
            self.edges.rotate_left(pos);
        }
    }
}

/// Why a leg's fill came up short of the notional it targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitedBy {
    Depth,
    MinNotional,
    None,
}

/// Why a cycle was rejected. Control flow, not an error — tallied in
/// `ScanStats`, never propagated as `anyhow::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    MissingSnapshot,
    Staleness,
    CrossedBook,
    InsufficientFill,
    BelowMinNotional,
    BelowProfitMargin,
}

/// Result of evaluating one cycle against live depth. Short-lived —
/// produced and (mostly) discarded per scan tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub cycle: Cycle,
    pub input_asset: Asset,
    pub input_qty: Decimal,
    pub output_qty: Decimal,
    pub gross_return: Decimal,
    pub fee_adjusted_return: Decimal,
    pub risk_adjusted_return: Decimal,
    pub worst_leg_fill_ratio: Decimal,
    pub limited_by: LimitedBy,
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

/// Recent-return volatility estimate for a symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolatilityEntry {
    pub sigma: f64,
    pub window_samples: u32,
    #[serde(skip, default = "Instant::now")]
    pub last_updated: Instant,
}
