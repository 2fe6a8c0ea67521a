//! Scanner — periodic bounded-concurrency re-evaluation loop (spec §4.7).
//!
//! One tick per `execution.tick_interval`. Enumeration runs once at
//! startup (the graph rarely changes); each tick re-evaluates every
//! known cycle concurrently, bounded by `execution.max_concurrent_evaluations`,
//! and skips the tick entirely if the previous one is still running —
//! no queuing, matching spec §5's "skip rather than queue" concurrency
//! rule. Evaluation itself is synchronous CPU work (no `.await` inside
//! `evaluate`), so each unit of work is spawned onto the blocking-aware
//! tokio thread pool the same way the teacher's
//! `spawn_arbitrage_detector`-style tasks in the other pack's
//! `arbitrage-engine.rs` hand CPU work to dedicated tasks rather than
//! awaiting it inline on the scan loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::config::{ExecutionConfig, RiskModelConfig};
use crate::evaluator;
use crate::models::{Cycle, EvaluationRecord, RejectReason};
use crate::orderbook_cache::OrderBookCache;
use crate::sink::OpportunitySink;
use crate::volatility::VolatilityCache;

/// Atomic tick-over-tick counters, grounded in the teacher's
/// `FeedMetrics`/`PerformanceStats` idiom in `scrapers/binance_book_ticker.rs`.
#[derive(Default)]
pub struct ScanStats {
    pub ticks_run: AtomicU64,
    pub ticks_skipped_busy: AtomicU64,
    pub qualified: AtomicU64,
    pub rejected_staleness: AtomicU64,
    pub rejected_crossed: AtomicU64,
    pub rejected_fill: AtomicU64,
    pub rejected_notional: AtomicU64,
    pub rejected_threshold: AtomicU64,
    pub rejected_missing: AtomicU64,
}

impl ScanStats {
    fn record_rejection(&self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::MissingSnapshot => &self.rejected_missing,
            RejectReason::Staleness => &self.rejected_staleness,
            RejectReason::CrossedBook => &self.rejected_crossed,
            RejectReason::InsufficientFill => &self.rejected_fill,
            RejectReason::BelowMinNotional => &self.rejected_notional,
            RejectReason::BelowProfitMargin => &self.rejected_threshold,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct Scanner {
    cycles: Arc<Vec<Cycle>>,
    cache: Arc<OrderBookCache>,
    volatility: Arc<VolatilityCache>,
    risk_model: Arc<RiskModelConfig>,
    execution: ExecutionConfig,
    sink: OpportunitySink,
    stats: Arc<ScanStats>,
}

impl Scanner {
    pub fn new(
        cycles: Vec<Cycle>,
        cache: Arc<OrderBookCache>,
        volatility: Arc<VolatilityCache>,
        risk_model: RiskModelConfig,
        execution: ExecutionConfig,
        sink: OpportunitySink,
    ) -> Self {
        Self {
            cycles: Arc::new(cycles),
            cache,
            volatility,
            risk_model: Arc::new(risk_model),
            execution,
            sink,
            stats: Arc::new(ScanStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ScanStats> {
        self.stats.clone()
    }

    /// Runs until `shutdown` reports `true`. Each tick's work is spawned
    /// as its own task rather than awaited inline, so a genuinely slow
    /// tick can still be outstanding when the next `interval.tick()`
    /// fires; when that happens the new tick is skipped — no queuing
    /// (spec §4.7) — instead of tokio's default `MissedTickBehavior::Burst`
    /// running a backlog of catch-up ticks back to back.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.execution.tick_interval);
        let mut outstanding: Option<tokio::task::JoinHandle<Vec<EvaluationRecord>>> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scanner shutting down");
                        break;
                    }
                    continue;
                }
            }

            if let Some(handle) = &outstanding {
                if !handle.is_finished() {
                    self.stats.ticks_skipped_busy.fetch_add(1, Ordering::Relaxed);
                    debug!("scan tick skipped: previous tick still running");
                    continue;
                }
            }
            if let Some(handle) = outstanding.take() {
                self.collect_tick(handle).await;
            }

            outstanding = Some(tokio::spawn(run_tick(
                self.cycles.clone(),
                self.cache.clone(),
                self.volatility.clone(),
                self.risk_model.clone(),
                self.execution.clone(),
                self.stats.clone(),
            )));
        }

        if let Some(handle) = outstanding {
            self.collect_tick(handle).await;
        }
    }

    async fn collect_tick(&self, handle: tokio::task::JoinHandle<Vec<EvaluationRecord>>) {
        let records = match handle.await {
            Ok(records) => records,
            Err(join_err) => {
                warn!(%join_err, "scan tick task panicked");
                return;
            }
        };
        self.stats.ticks_run.fetch_add(1, Ordering::Relaxed);
        let delivered = self.sink.deliver(records);
        if delivered > 0 {
            info!(delivered, "scan tick delivered qualifying opportunities");
        }
    }
}

/// One tick's worth of evaluations, bounded by
/// `execution.max_concurrent_evaluations` and run as its own task so the
/// scan loop can detect whether it is still outstanding at the next
/// interval.
async fn run_tick(
    cycles: Arc<Vec<Cycle>>,
    cache: Arc<OrderBookCache>,
    volatility: Arc<VolatilityCache>,
    risk_model: Arc<RiskModelConfig>,
    execution: ExecutionConfig,
    stats: Arc<ScanStats>,
) -> Vec<EvaluationRecord> {
    let semaphore = Arc::new(Semaphore::new(execution.max_concurrent_evaluations));
    let now = Instant::now();
    let input_notional = execution.input_notional;

    let mut handles = Vec::with_capacity(cycles.len());
    for cycle in cycles.iter() {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore open");
        let cycle = cycle.clone();
        let cache = cache.clone();
        let volatility = volatility.clone();
        let risk_model = risk_model.clone();
        let input_qty: Decimal = input_notional;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            evaluator::evaluate(&cycle, input_qty, &cache, &volatility, &risk_model, now)
        });
        handles.push(handle);
    }

    let mut records = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(record)) => {
                stats.qualified.fetch_add(1, Ordering::Relaxed);
                records.push(record);
            }
            Ok(Err(reason)) => stats.record_rejection(reason),
            Err(join_err) => warn!(%join_err, "evaluation task panicked"),
        }
    }
    records
}
