//! Binance partial-depth ingress — single-writer task per (exchange,
//! symbol), grounded directly in the teacher's
//! `scrapers/binance_book_ticker.rs::BinanceBookTickerFeed::run_loop`:
//! the same shutdown/connected `AtomicBool` pair, the same doubling
//! reconnect delay capped at 30s. This adapter subscribes to Binance's
//! partial-depth stream (`<symbol>@depth20@100ms`), where every message
//! is a self-contained top-20 snapshot, so applying an update is just
//! translating the message into an `OrderBookSnapshot` and handing it to
//! the cache — no incremental diff state to maintain per symbol.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::models::{Level, OrderBookSnapshot};
use crate::orderbook_cache::{BookUpdate, OrderBookCache, SymbolKey};

const EXCHANGE_ID: &str = "binance";

#[derive(Deserialize)]
struct DepthMessage {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

fn parse_levels(raw: &[[String; 2]]) -> Vec<Level> {
    raw.iter()
        .filter_map(|[price, qty]| {
            let price = Decimal::from_str(price).ok()?;
            let qty = Decimal::from_str(qty).ok()?;
            Some(Level { price, qty })
        })
        .collect()
}

pub struct BinanceIngress {
    symbol: String,
    cache: Arc<OrderBookCache>,
    shutdown: AtomicBool,
}

impl BinanceIngress {
    pub fn new(symbol: impl Into<String>, cache: Arc<OrderBookCache>) -> Arc<Self> {
        Arc::new(Self {
            symbol: symbol.into(),
            cache,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn key(&self) -> SymbolKey {
        (EXCHANGE_ID.to_string(), self.symbol.to_uppercase())
    }

    fn stream_url(&self) -> String {
        format!(
            "wss://stream.binance.com:9443/ws/{}@depth20@100ms",
            self.symbol.to_lowercase()
        )
    }

    /// Reconnect loop: doubling backoff capped at 30s, with up to 20%
    /// jitter so correlated reconnects across many symbol tasks don't
    /// all retry in lockstep (the teacher's single-feed version has no
    /// jitter since it only ever runs one connection).
    pub async fn run_loop(self: Arc<Self>) {
        let mut reconnect_delay = Duration::from_millis(100);
        let max_delay = Duration::from_secs(30);

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.connect_and_stream().await {
                Ok(()) => {
                    reconnect_delay = Duration::from_millis(100);
                }
                Err(err) => {
                    warn!(symbol = %self.symbol, error = %err, "binance ingress disconnected");
                    let jitter = rand::thread_rng().gen_range(0.0..0.2);
                    let backoff = reconnect_delay.mul_f64(1.0 + jitter);
                    tokio::time::sleep(backoff).await;
                    reconnect_delay = (reconnect_delay * 2).min(max_delay);
                }
            }
        }
    }

    async fn connect_and_stream(&self) -> Result<()> {
        let url = self.stream_url();
        let (ws_stream, _) = connect_async(&url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        info!(symbol = %self.symbol, "binance ingress connected");
        let (_write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            let msg = msg.context("websocket read")?;
            let Message::Text(text) = msg else {
                continue;
            };
            let parsed: DepthMessage =
                serde_json::from_str(&text).context("decoding depth message")?;

            let snapshot = OrderBookSnapshot {
                exchange_id: EXCHANGE_ID.to_string(),
                symbol: self.symbol.to_uppercase(),
                bids: parse_levels(&parsed.bids),
                asks: parse_levels(&parsed.asks),
                sequence_no: parsed.last_update_id,
                last_updated: std::time::Instant::now(),
            };
            // `depth20@100ms` is a partial-depth snapshot: `lastUpdateId`
            // is not contiguous between messages, so this is always a
            // Snapshot, never a Delta (spec §4.2).
            self.cache
                .apply_update(&self.key(), BookUpdate::Snapshot(snapshot));
        }

        Ok(())
    }
}
