//! Order-Book Cache — single-writer-per-symbol, many-reader (spec §4.2).
//!
//! Follows the teacher's `scrapers/binance_book_ticker.rs` idiom: an
//! `ArcSwap<OrderBookSnapshot>` per symbol for the lock-free read path,
//! published atomically after the writer applies an update. The outer
//! symbol-to-state map is a `parking_lot::RwLock<HashMap<..>>`, the same
//! shape as `scrapers/polymarket_book_store.rs` and
//! `LiveOrderbookCache` in the example pack — registered symbols almost
//! never change after ingress tasks start, so the map lock is cold.
//!
//! Sequence-gap detection and crossed-book detection both mark a symbol
//! stale rather than erroring: staleness is read-path control flow (spec
//! §7), not a propagated `anyhow::Error`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

use crate::models::OrderBookSnapshot;

pub type SymbolKey = (String, String);

/// Emitted off the hot path when a writer detects a sequence gap or a
/// crossed book, so the owning ingress task can request a fresh
/// snapshot. Mirrors the teacher's `GapEvent` channel.
#[derive(Debug, Clone)]
pub struct ResyncRequest {
    pub exchange_id: String,
    pub symbol: String,
    pub reason: ResyncReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    SequenceGap { expected: u64, received: u64 },
    CrossedBook,
}

/// An update applied by the single writer for a symbol (spec §4.2).
///
/// `Snapshot` is a complete, self-describing view of the book — the
/// first update for a symbol, a resync response, or (as with Binance's
/// `depth20` partial-depth stream) every message an ingress adapter
/// receives. Its `sequence_no` is not expected to be contiguous with
/// the previous one, so applying it never triggers gap detection — it
/// simply replaces what the cache holds, the same way the teacher's
/// `process_snapshot` keeps serving the latest value on a gap rather
/// than refusing it (`scrapers/binance_book_ticker.rs`).
///
/// `Delta` is an incremental update whose `sequence_no` is expected to
/// be exactly one more than the last applied sequence number; a gap
/// here is the condition spec §4.2 requires a resync for.
pub enum BookUpdate {
    Snapshot(OrderBookSnapshot),
    Delta(OrderBookSnapshot),
}

impl BookUpdate {
    fn is_delta(&self) -> bool {
        matches!(self, BookUpdate::Delta(_))
    }
}

struct SymbolState {
    latest: ArcSwap<OrderBookSnapshot>,
    stale: AtomicBool,
    last_seq: AtomicU64,
    last_update_mono_ns: AtomicU64,
}

impl SymbolState {
    fn new(initial: OrderBookSnapshot) -> Self {
        let seq = initial.sequence_no;
        Self {
            latest: ArcSwap::from_pointee(initial),
            stale: AtomicBool::new(false),
            last_seq: AtomicU64::new(seq),
            last_update_mono_ns: AtomicU64::new(mono_now_ns()),
        }
    }
}

#[inline]
fn mono_now_ns() -> u64 {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

pub struct OrderBookCache {
    symbols: RwLock<HashMap<SymbolKey, Arc<SymbolState>>>,
    staleness_bound: Duration,
    resync_tx: mpsc::UnboundedSender<ResyncRequest>,
}

impl OrderBookCache {
    pub fn new(
        staleness_bound: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ResyncRequest>) {
        let (resync_tx, resync_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(Self {
            symbols: RwLock::new(HashMap::new()),
            staleness_bound,
            resync_tx,
        });
        (cache, resync_rx)
    }

    /// HOT PATH — no allocations beyond the snapshot itself, no logging.
    /// Applies a writer-supplied update, detects sequence gaps and
    /// crossed books, and publishes the new snapshot for readers.
    pub fn apply_update(&self, key: &SymbolKey, update: BookUpdate) {
        let is_delta = update.is_delta();
        let snapshot = match update {
            BookUpdate::Snapshot(s) => s,
            BookUpdate::Delta(s) => s,
        };
        let crossed = matches!(
            (snapshot.best_bid(), snapshot.best_ask()),
            (Some(b), Some(a)) if b.price >= a.price
        );

        let state = self.state_for(key, || snapshot.clone());
        let expected = state.last_seq.load(Ordering::Acquire).wrapping_add(1);
        // Contiguity only means something for an incremental delta — a
        // full snapshot is self-describing and replaces state outright
        // regardless of where its sequence number falls.
        let gapped = is_delta
            && state.last_seq.load(Ordering::Acquire) != 0
            && snapshot.sequence_no != 0
            && snapshot.sequence_no != expected
            && snapshot.sequence_no > state.last_seq.load(Ordering::Acquire);

        state.last_seq.store(snapshot.sequence_no, Ordering::Release);
        state
            .last_update_mono_ns
            .store(mono_now_ns(), Ordering::Release);
        // A gap leaves the symbol stale until a subsequent update arrives
        // without its own gap (typically a fresh full snapshot the
        // ingress adapter fetches in response to the resync request).
        state.stale.store(crossed || gapped, Ordering::Release);
        state.latest.store(Arc::new(snapshot));

        if gapped {
            let _ = self.resync_tx.send(ResyncRequest {
                exchange_id: key.0.clone(),
                symbol: key.1.clone(),
                reason: ResyncReason::SequenceGap {
                    expected,
                    received: state.last_seq.load(Ordering::Acquire),
                },
            });
        }
        if crossed {
            let _ = self.resync_tx.send(ResyncRequest {
                exchange_id: key.0.clone(),
                symbol: key.1.clone(),
                reason: ResyncReason::CrossedBook,
            });
        }
    }

    fn state_for(
        &self,
        key: &SymbolKey,
        make_initial: impl FnOnce() -> OrderBookSnapshot,
    ) -> Arc<SymbolState> {
        if let Some(state) = self.symbols.read().get(key) {
            return state.clone();
        }
        let mut symbols = self.symbols.write();
        symbols
            .entry(key.clone())
            .or_insert_with(|| Arc::new(SymbolState::new(make_initial())))
            .clone()
    }

    /// Read path: clones the `Arc` behind the snapshot, no locks beyond
    /// the (cold) outer map lookup.
    pub fn read(&self, key: &SymbolKey) -> Option<Arc<OrderBookSnapshot>> {
        let state = self.symbols.read().get(key)?.clone();
        Some(state.latest.load_full())
    }

    /// A symbol is usable iff it exists, is within the staleness bound,
    /// not marked crossed/gapped, and well-formed.
    pub fn is_fresh(&self, key: &SymbolKey, now: Instant) -> bool {
        let Some(state) = self.symbols.read().get(key).cloned() else {
            return false;
        };
        if state.stale.load(Ordering::Acquire) {
            return false;
        }
        let snapshot = state.latest.load_full();
        snapshot.age(now) <= self.staleness_bound && snapshot.is_well_formed()
    }

    /// Forces a symbol stale — used when an ingress adapter detects an
    /// internal invariant violation it cannot self-heal from (§7
    /// quarantine pattern).
    pub fn quarantine(&self, key: &SymbolKey, reason: &str) {
        if let Some(state) = self.symbols.read().get(key) {
            state.stale.store(true, Ordering::Release);
        }
        warn!(exchange = %key.0, symbol = %key.1, reason, "order-book symbol quarantined");
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.read().len()
    }
}
