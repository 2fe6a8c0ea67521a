//! Path Evaluator — per-leg depth-walk simulation (spec §4.6).
//!
//! Each leg of a cycle is simulated against the live order book: a BUY
//! edge walks asks ascending (spending quote, receiving base), a SELL
//! edge walks bids descending (spending base, receiving quote). Partial
//! fills are tracked explicitly — a leg that cannot absorb the full
//! input notional is marked `LimitedBy::Depth` rather than silently
//! assumed to fill, which is how the teacher's `fees.rs`
//! `FeeCalculator::calculate_net_profit` keeps fee/size accounting
//! explicit instead of folding it into a single opaque number.
//!
//! Decimal arithmetic throughout (`rust_decimal`): the margins this
//! component compares against are fractions of a percent on
//! multi-thousand-unit notionals, where `f64` rounding would make the
//! min-profit-margin gate meaningless.

use std::time::Instant;

use rust_decimal::Decimal;

use crate::config::RiskModelConfig;
use crate::models::{Cycle, Edge, EvaluationRecord, LimitedBy, Level, RejectReason, Side};
use crate::orderbook_cache::OrderBookCache;
use crate::volatility::VolatilityCache;

struct LegResult {
    output_qty: Decimal,
    fill_ratio: Decimal,
    limited_by: LimitedBy,
    /// Quote-denominated notional this leg actually consumed, for the
    /// depth-consumption score (spec §4.6).
    quote_consumed: Decimal,
    /// price * qty of the first level available when the leg walked —
    /// the "top of book" a depth-consumption ratio is measured against.
    top_of_book_notional: Decimal,
}

/// Walks one side of a book, spending up to `input_qty` of the leg's
/// `from_asset`, returning how much of `to_asset` was received.
fn walk_leg(edge: &Edge, levels: &[Level], input_qty: Decimal) -> LegResult {
    if input_qty <= Decimal::ZERO || levels.is_empty() {
        return LegResult {
            output_qty: Decimal::ZERO,
            fill_ratio: Decimal::ZERO,
            limited_by: LimitedBy::Depth,
            quote_consumed: Decimal::ZERO,
            top_of_book_notional: Decimal::ZERO,
        };
    }

    let top_of_book_notional = levels[0].price * levels[0].qty;
    let mut remaining = input_qty;
    let mut output = Decimal::ZERO;
    // Quote-denominated notional consumed so far, tracked regardless of
    // which side the leg walks.
    let mut quote_consumed = Decimal::ZERO;

    for level in levels {
        if remaining <= Decimal::ZERO {
            break;
        }
        match edge.side {
            // Spending quote, buying base: each level can absorb
            // price*qty of quote before exhausting.
            Side::Buy => {
                let level_notional = level.price * level.qty;
                if remaining >= level_notional {
                    output += level.qty;
                    remaining -= level_notional;
                    quote_consumed += level_notional;
                } else {
                    let affordable_qty = remaining / level.price;
                    output += affordable_qty;
                    quote_consumed += remaining;
                    remaining = Decimal::ZERO;
                }
            }
            // Spending base, selling into bids: each level can absorb
            // qty base units.
            Side::Sell => {
                if remaining >= level.qty {
                    let level_notional = level.qty * level.price;
                    output += level_notional;
                    quote_consumed += level_notional;
                    remaining -= level.qty;
                } else {
                    let level_notional = remaining * level.price;
                    output += level_notional;
                    quote_consumed += level_notional;
                    remaining = Decimal::ZERO;
                }
            }
        }
    }

    let filled_input = input_qty - remaining;
    let fill_ratio = if input_qty.is_zero() {
        Decimal::ZERO
    } else {
        filled_input / input_qty
    };
    let limited_by = if remaining > Decimal::ZERO {
        LimitedBy::Depth
    } else {
        LimitedBy::None
    };

    let fee_multiplier = Decimal::ONE - edge.market.taker_fee;
    LegResult {
        output_qty: output * fee_multiplier,
        fill_ratio,
        limited_by,
        quote_consumed,
        top_of_book_notional,
    }
}

/// Evaluates one cycle at the given input notional. Returns `Ok` with a
/// fully-populated record when the cycle clears every gate, `Err` with
/// the first reason it failed otherwise — rejections are counted in
/// `ScanStats`, never propagated as `anyhow::Error` (spec §7).
pub fn evaluate(
    cycle: &Cycle,
    input_qty: Decimal,
    cache: &OrderBookCache,
    volatility: &VolatilityCache,
    risk_model: &RiskModelConfig,
    now: Instant,
) -> Result<EvaluationRecord, RejectReason> {
    if cycle.is_empty() {
        return Err(RejectReason::MissingSnapshot);
    }

    let mut qty = input_qty;
    let mut worst_fill_ratio = Decimal::ONE;
    let mut worst_limited_by = LimitedBy::None;
    let mut symbol_keys = Vec::with_capacity(cycle.len());
    // Sum of (quote_consumed / top_of_book_notional) across legs — spec
    // §4.6's depth-consumption score. A leg that fully fills without
    // walking past the first level contributes ~1; one that walks
    // through extra levels (S3) contributes more, even at fill_ratio 1.
    let mut depth_consumption_score = Decimal::ZERO;

    for edge in &cycle.edges {
        let key = edge.market.key();
        symbol_keys.push(key.clone());

        if !cache.is_fresh(&key, now) {
            return Err(RejectReason::Staleness);
        }
        let snapshot = cache.read(&key).ok_or(RejectReason::MissingSnapshot)?;
        if !snapshot.is_well_formed() {
            return Err(RejectReason::CrossedBook);
        }

        let notional_quote = match edge.side {
            Side::Buy => qty,
            Side::Sell => qty * snapshot.best_bid().map(|l| l.price).unwrap_or(Decimal::ZERO),
        };
        if notional_quote < edge.market.min_notional_quote {
            return Err(RejectReason::BelowMinNotional);
        }

        let levels: &[Level] = match edge.side {
            Side::Buy => &snapshot.asks,
            Side::Sell => &snapshot.bids,
        };
        let leg = walk_leg(edge, levels, qty);

        if leg.limited_by == LimitedBy::Depth {
            worst_limited_by = LimitedBy::Depth;
        }
        if leg.fill_ratio < worst_fill_ratio {
            worst_fill_ratio = leg.fill_ratio;
        }
        if leg.top_of_book_notional > Decimal::ZERO {
            depth_consumption_score += leg.quote_consumed / leg.top_of_book_notional;
        }

        if leg.fill_ratio < risk_model.min_leg_fill_ratio && risk_model.reject_on_partial_fill {
            return Err(RejectReason::InsufficientFill);
        }

        qty = leg.output_qty;
        if qty <= Decimal::ZERO {
            return Err(RejectReason::InsufficientFill);
        }
    }

    let gross_return = qty / input_qty - Decimal::ONE;
    let fee_adjusted_return = gross_return; // fees already folded into each leg's output above.

    let worst_sigma = volatility.worst_of(
        &symbol_keys,
        risk_model.fallback_sigma,
        risk_model.max_sigma_age,
        now,
    );
    let vol_penalty = risk_model.vol_risk_multiplier
        * Decimal::from_f64_retain(worst_sigma).unwrap_or(Decimal::ZERO);
    let slippage_penalty = risk_model.slippage_coefficient * depth_consumption_score;
    let risk_adjusted_return = fee_adjusted_return - vol_penalty - slippage_penalty;

    if risk_adjusted_return < risk_model.min_profit_margin {
        return Err(RejectReason::BelowProfitMargin);
    }

    Ok(EvaluationRecord {
        cycle: cycle.clone(),
        input_asset: cycle.start_asset().cloned().unwrap_or_else(|| "".into()),
        input_qty,
        output_qty: qty,
        gross_return,
        fee_adjusted_return,
        risk_adjusted_return,
        worst_leg_fill_ratio: worst_fill_ratio,
        limited_by: worst_limited_by,
        timestamp: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Asset, MarketDescriptor, OrderBookSnapshot};
    use crate::orderbook_cache::BookUpdate;
    use crate::registry::MarketRegistry;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn flat_market(exchange: &str, symbol: &str, base: &str, quote: &str) -> MarketDescriptor {
        MarketDescriptor {
            exchange_id: exchange.into(),
            symbol: symbol.into(),
            base: Asset::new(base),
            quote: Asset::new(quote),
            taker_fee: dec!(0.001),
            min_notional_quote: dec!(10),
            price_tick: dec!(0.01),
            qty_tick: dec!(0.00001),
        }
    }

    fn risk_model() -> RiskModelConfig {
        RiskModelConfig {
            min_profit_margin: dec!(0.0001),
            vol_risk_multiplier: dec!(1.0),
            slippage_coefficient: dec!(0.5),
            staleness_bound: Duration::from_millis(750),
            min_leg_fill_ratio: dec!(0.9),
            reject_on_partial_fill: true,
            fallback_sigma: 0.01,
            max_sigma_age: Duration::from_secs(60),
        }
    }

    #[test]
    fn flat_book_yields_no_profit() {
        let registry = MarketRegistry::new();
        let m1 = registry
            .register(flat_market("binance", "BTCUSDT", "BTC", "USDT"))
            .unwrap();
        let m2 = registry
            .register(flat_market("binance", "ETHUSDT", "ETH", "USDT"))
            .unwrap();
        let m3 = registry
            .register(flat_market("binance", "ETHBTC", "ETH", "BTC"))
            .unwrap();

        let (cache, _rx) = OrderBookCache::new(Duration::from_millis(750));
        seed_flat(&cache, &m1, dec!(50000));
        seed_flat(&cache, &m2, dec!(3000));
        seed_flat(&cache, &m3, dec!(0.06));

        let cycle = Cycle {
            edges: vec![
                Edge::for_market(m1.clone(), Side::Buy),
                Edge::for_market(m3.clone(), Side::Sell),
                Edge::for_market(m2.clone(), Side::Sell),
            ],
        };
        let volatility = VolatilityCache::new();
        let result = evaluate(
            &cycle,
            dec!(1000),
            &cache,
            &volatility,
            &risk_model(),
            Instant::now(),
        );
        match result {
            Err(RejectReason::BelowProfitMargin) => {}
            other => panic!("expected no-profit rejection, got {other:?}"),
        }
    }

    fn seed_flat(cache: &Arc<OrderBookCache>, market: &Arc<MarketDescriptor>, mid: Decimal) {
        let mut snap = OrderBookSnapshot::empty(&market.exchange_id, &market.symbol);
        snap.sequence_no = 1;
        snap.bids.push(Level {
            price: mid,
            qty: dec!(1000),
        });
        snap.asks.push(Level {
            price: mid,
            qty: dec!(1000),
        });
        // Slightly separate bid/ask so the book is not flagged crossed.
        snap.bids[0].price -= mid * dec!(0.0001);
        snap.asks[0].price += mid * dec!(0.0001);
        cache.apply_update(&market.key(), BookUpdate::Snapshot(snap));
    }

    #[test]
    fn depth_limited_leg_is_marked() {
        let registry = MarketRegistry::new();
        let market = registry
            .register(flat_market("binance", "BTCUSDT", "BTC", "USDT"))
            .unwrap();
        let (cache, _rx) = OrderBookCache::new(Duration::from_millis(750));
        let mut snap = OrderBookSnapshot::empty("binance", "BTCUSDT");
        snap.sequence_no = 1;
        snap.asks.push(Level {
            price: dec!(50000),
            qty: dec!(0.001),
        });
        snap.bids.push(Level {
            price: dec!(49990),
            qty: dec!(1),
        });
        cache.apply_update(&market.key(), BookUpdate::Snapshot(snap));

        let edge = Edge::for_market(market, Side::Buy);
        let leg = walk_leg(&edge, &[Level { price: dec!(50000), qty: dec!(0.001) }], dec!(1000));
        assert_eq!(leg.limited_by, LimitedBy::Depth);
        assert!(leg.fill_ratio < Decimal::ONE);
    }
}
