use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use arb_scanner::config::Config;
use arb_scanner::enumerator;
use arb_scanner::graph::MarketGraph;
use arb_scanner::ingress::binance::BinanceIngress;
use arb_scanner::ingress::metadata::{MetadataProvider, StaticMetadataProvider};
use arb_scanner::models::{Asset, MarketDescriptor};
use arb_scanner::orderbook_cache::OrderBookCache;
use arb_scanner::registry::MarketRegistry;
use arb_scanner::scanner::Scanner;
use arb_scanner::sink::OpportunitySink;
use arb_scanner::volatility::VolatilityCache;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arb_scanner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Demo market set used until a real metadata provider is wired in.
/// Stands in for the exchange's `exchangeInfo` response (spec §6 #1).
fn demo_markets() -> Vec<MarketDescriptor> {
    use rust_decimal_macros::dec;

    vec![
        MarketDescriptor {
            exchange_id: "binance".into(),
            symbol: "BTCUSDT".into(),
            base: Asset::new("BTC"),
            quote: Asset::new("USDT"),
            taker_fee: dec!(0.001),
            min_notional_quote: dec!(10),
            price_tick: dec!(0.01),
            qty_tick: dec!(0.00001),
        },
        MarketDescriptor {
            exchange_id: "binance".into(),
            symbol: "ETHUSDT".into(),
            base: Asset::new("ETH"),
            quote: Asset::new("USDT"),
            taker_fee: dec!(0.001),
            min_notional_quote: dec!(10),
            price_tick: dec!(0.01),
            qty_tick: dec!(0.0001),
        },
        MarketDescriptor {
            exchange_id: "binance".into(),
            symbol: "ETHBTC".into(),
            base: Asset::new("ETH"),
            quote: Asset::new("BTC"),
            taker_fee: dec!(0.001),
            min_notional_quote: dec!(0.001),
            price_tick: dec!(0.000001),
            qty_tick: dec!(0.0001),
        },
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("arbitrage scanner starting");

    let config = Config::from_env().context("loading configuration")?;

    let registry = Arc::new(MarketRegistry::new());
    let metadata_provider = StaticMetadataProvider::new(demo_markets());
    for market in metadata_provider
        .markets()
        .context("loading market metadata")?
    {
        registry
            .register(market)
            .context("registering market descriptor")?;
    }
    info!(markets = registry.len(), "market registry populated");

    let graph = MarketGraph::build(&registry);
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "market graph built"
    );

    let cycles = enumerator::enumerate(&graph, &config.paths);
    info!(cycles = cycles.len(), "cycle enumeration complete");

    let (cache, mut resync_rx) = OrderBookCache::new(config.risk_model.staleness_bound);
    let volatility = Arc::new(VolatilityCache::new());

    let mut ingress_tasks = Vec::new();
    for market in registry.all() {
        if market.exchange_id != "binance" {
            continue;
        }
        let ingress = BinanceIngress::new(market.symbol.clone(), cache.clone());
        let ingress_clone = ingress.clone();
        ingress_tasks.push(tokio::spawn(async move { ingress_clone.run_loop().await }));
    }

    tokio::spawn(async move {
        while let Some(request) = resync_rx.recv().await {
            tracing::warn!(
                exchange = %request.exchange_id,
                symbol = %request.symbol,
                reason = ?request.reason,
                "resync requested"
            );
        }
    });

    let (sink, mut opportunities) = OpportunitySink::new(config.execution.opportunity_channel_capacity);
    tokio::spawn(async move {
        while let Some(record) = opportunities.recv().await {
            info!(
                return_bps = %(record.risk_adjusted_return * rust_decimal::Decimal::from(10_000)),
                legs = record.cycle.len(),
                "qualifying opportunity"
            );
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let scanner = Scanner::new(
        cycles,
        cache,
        volatility,
        config.risk_model,
        config.execution,
        sink,
    );
    scanner.run(shutdown_rx).await;

    for task in ingress_tasks {
        task.abort();
    }

    Ok(())
}
