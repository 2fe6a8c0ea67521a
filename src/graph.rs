//! Market Graph — directed multigraph over assets (spec §4.4).
//!
//! Built once from a `MarketRegistry` snapshot and rebuilt wholesale
//! when the registry changes (registrations are rare after startup).
//! Every market contributes two parallel edges (BUY and SELL), so a
//! graph over N markets has up to 2N edges — hence "multigraph": two
//! assets may be joined by several edges from different markets or
//! exchanges.

use std::collections::HashMap;

use crate::models::{Asset, Edge, Side};
use crate::registry::MarketRegistry;

pub struct MarketGraph {
    /// Adjacency list: outgoing edges keyed by source asset.
    adjacency: HashMap<Asset, Vec<Edge>>,
    vertices: Vec<Asset>,
}

impl MarketGraph {
    pub fn build(registry: &MarketRegistry) -> Self {
        let mut adjacency: HashMap<Asset, Vec<Edge>> = HashMap::new();
        for market in registry.all() {
            for side in [Side::Buy, Side::Sell] {
                let edge = Edge::for_market(market.clone(), side);
                adjacency
                    .entry(edge.from_asset.clone())
                    .or_default()
                    .push(edge);
            }
        }
        let mut vertices: Vec<Asset> = adjacency.keys().cloned().collect();
        vertices.sort();
        Self {
            adjacency,
            vertices,
        }
    }

    pub fn edges_from(&self, asset: &Asset) -> &[Edge] {
        self.adjacency.get(asset).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge in the graph, in no particular order (spec §4.4).
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.adjacency.values().flatten()
    }

    pub fn vertices(&self) -> &[Asset] {
        &self.vertices
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Property: every market registered contributes exactly two edges
    /// (spec §8 "graph bijection" property), so edge_count() == 2 *
    /// registry.len() always holds after `build`.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}
