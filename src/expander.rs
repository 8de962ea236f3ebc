//! Neighbourhood expander (§4.1).
//!
//! Given a graph and a set of seed nodes, produces every (seed, node,
//! distance) triple reachable within `h` hops, keeping only the minimum
//! distance per (seed, node) pair. The same iterative relational expansion
//! runs whether the caller is exploring the (tiny) query graph or the
//! (potentially large) target graph -- the contract is identical either way
//! (§4.1 "Why this shape").

use std::collections::HashMap;

use tracing::debug;

use crate::error::{MatchError, MatchResult};
use crate::types::{Graph, NeighbourTriple, NodeId};

fn validate(graph: &Graph, h: i32) -> MatchResult<()> {
    if h < 0 {
        return Err(MatchError::invalid_argument(format!("hop radius h must be >= 0, got {h}")));
    }
    if graph.has_self_loop() {
        return Err(MatchError::invalid_argument("graph contains a self-loop; only simple graphs are supported"));
    }
    Ok(())
}

/// Expand every seed in `seeds` up to `h` hops, returning the union of all
/// (seed, node, distance) triples with duplicates collapsed to their
/// minimum distance. For `h == 0` this is exactly the seeds themselves at
/// distance 0.
pub fn expand(graph: &Graph, seeds: &[NodeId], h: i32) -> MatchResult<Vec<NeighbourTriple>> {
    validate(graph, h)?;

    let mut best: HashMap<(NodeId, NodeId), u32> = HashMap::new();
    let mut frontier: Vec<(NodeId, NodeId, u32)> = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        if best.insert((seed, seed), 0).is_none() {
            frontier.push((seed, seed, 0));
        }
    }

    let mut i = 0u32;
    while i < h as u32 && !frontier.is_empty() {
        let mut next = Vec::new();
        for &(seed, node, dist) in &frontier {
            for &nb in graph.neighbours(node) {
                let nd = dist + 1;
                let is_new = match best.get(&(seed, nb)) {
                    Some(&existing) => nd < existing,
                    None => true,
                };
                if is_new {
                    best.insert((seed, nb), nd);
                    next.push((seed, nb, nd));
                }
            }
        }
        debug!(target: "graphmatch::expander", "hop {} added {} new (seed,node) pairs", i + 1, next.len());
        frontier = next;
        i += 1;
    }

    let mut out: Vec<NeighbourTriple> = best
        .into_iter()
        .map(|((seed, node), distance)| NeighbourTriple { seed, node, distance })
        .collect();
    out.sort_by_key(|t| (t.seed, t.node));
    Ok(out)
}

/// Convenience wrapper for a single seed.
pub fn neighbours(graph: &Graph, seed: NodeId, h: i32) -> MatchResult<Vec<NeighbourTriple>> {
    expand(graph, &[seed], h)
}
