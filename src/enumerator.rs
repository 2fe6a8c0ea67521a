//! Path Enumerator — DFS cycle search with canonicalization and pruning
//! (spec §4.5).
//!
//! Uses an explicit stack rather than recursion: cycle depth is small
//! (spec bounds it at `paths.max_len`, typically <= 5) but the fan-out
//! at each vertex can be large on a busy exchange, and an explicit stack
//! keeps the search iterative and easy to bound memory-wise, matching
//! the style of the other pack's `bellman_ford.rs` cycle reconstruction
//! (predecessor-following rather than recursive backtracking).
//!
//! Pruning rules applied while expanding a frame, exactly as specified:
//! 1. no revisiting an asset already on the current path, unless
//!    `paths.allow_revisit_nodes` is set,
//! 2. no using the same (exchange_id, symbol) edge twice in one cycle,
//!    unless `paths.allow_same_market_twice` is set,
//! 3. depth bounded by `paths.max_len`,
//! 4. no crossing exchanges mid-path unless explicitly allowed.
//!
//! A cycle is only emitted when it returns to its start asset with
//! length >= `paths.min_len`, and only once per equivalence class of
//! rotations — canonicalized by rotating to the lexicographically
//! smallest asset on the cycle before dedup.

use std::collections::{HashSet, VecDeque};

use crate::config::PathsConfig;
use crate::graph::MarketGraph;
use crate::models::{Asset, Cycle, Edge, Side};

struct Frame {
    path: Vec<Edge>,
    visited_assets: HashSet<Asset>,
    visited_edges: HashSet<(String, String, Side)>,
    current: Asset,
    exchange_id: Option<String>,
}

pub fn enumerate(graph: &MarketGraph, config: &PathsConfig) -> Vec<Cycle> {
    let mut found = Vec::new();
    let mut seen_canonical = HashSet::new();

    for start in &config.start_assets {
        if graph.edges_from(start).is_empty() {
            continue;
        }
        let mut stack: VecDeque<Frame> = VecDeque::new();
        stack.push_back(Frame {
            path: Vec::new(),
            visited_assets: HashSet::from([start.clone()]),
            visited_edges: HashSet::new(),
            current: start.clone(),
            exchange_id: None,
        });

        while let Some(frame) = stack.pop_back() {
            if frame.path.len() >= config.max_len {
                continue;
            }
            for edge in graph.edges_from(&frame.current) {
                // Rule 2: no reusing the same market edge twice, unless
                // explicitly allowed.
                let edge_id = edge.edge_id();
                if !config.allow_same_market_twice && frame.visited_edges.contains(&edge_id) {
                    continue;
                }
                // Rule 4: no crossing exchanges unless explicitly allowed.
                if !config.allow_cross_exchange {
                    if let Some(exchange_id) = &frame.exchange_id {
                        if exchange_id != &edge.market.exchange_id {
                            continue;
                        }
                    }
                }

                let closes_cycle = &edge.to_asset == start;
                // Rule 1: no revisiting an asset, except the closing
                // step back to the start, unless explicitly allowed.
                if !config.allow_revisit_assets
                    && !closes_cycle
                    && frame.visited_assets.contains(&edge.to_asset)
                {
                    continue;
                }

                let mut path = frame.path.clone();
                path.push(edge.clone());

                if closes_cycle {
                    if path.len() >= config.min_len {
                        let mut cycle = Cycle { edges: path.clone() };
                        cycle.rotate_to_canonical_start();
                        let canonical_id = cycle.canonical_id();
                        if seen_canonical.insert(canonical_id) {
                            found.push(cycle);
                        }
                    }
                    // A closing edge never extends further in this branch.
                    continue;
                }

                let mut visited_assets = frame.visited_assets.clone();
                visited_assets.insert(edge.to_asset.clone());
                let mut visited_edges = frame.visited_edges.clone();
                visited_edges.insert(edge_id);

                stack.push_back(Frame {
                    path,
                    visited_assets,
                    visited_edges,
                    current: edge.to_asset.clone(),
                    exchange_id: Some(edge.market.exchange_id.clone()),
                });
            }
        }
    }

    found
}

impl Cycle {
    /// Rotate to the lexicographically smallest start asset among the
    /// cycle's vertices, so every rotation of a cycle canonicalizes to
    /// the same representative.
    fn rotate_to_canonical_start(&mut self) {
        if self.edges.is_empty() {
            return;
        }
        let min_asset = self
            .edges
            .iter()
            .map(|e| &e.from_asset)
            .min()
            .cloned()
            .expect("non-empty cycle");
        self.rotate_to_start(&min_asset);
    }
}
