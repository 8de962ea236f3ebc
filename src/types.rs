//! Core data types: graphs, candidate matches, neighbour triples, join
//! records and search parameters. See the crate-level documentation for the
//! pipeline these types flow through.

use serde::{Deserialize, Serialize};

/// Node ids are dense non-negative integers, scoped to a single graph.
pub type NodeId = u32;

/// Opaque identifier a `GraphProvider` resolves to an adjacency list.
pub type GraphId = u64;

/// A simple, undirected, self-loop-free adjacency-list graph.
///
/// Edges are stored symmetrically: if `v` appears in `adj[u]` then `u`
/// appears in `adj[v]`. This is the in-memory shape the expander and join
/// stage operate over; a `GraphProvider` is responsible for producing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub adj: Vec<Vec<NodeId>>,
}

impl Graph {
    /// Build a graph from an undirected edge list over `n` nodes, storing
    /// each edge both ways and deduplicating neighbours.
    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for &(u, v) in edges {
            adj[u as usize].push(v);
            adj[v as usize].push(u);
        }
        for row in &mut adj {
            row.sort_unstable();
            row.dedup();
        }
        Graph { adj }
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    pub fn neighbours(&self, node: NodeId) -> &[NodeId] {
        self.adj.get(node as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Err` if any node has itself as a neighbour; the algorithm assumes
    /// simple graphs (§4.1 failure mode).
    pub fn has_self_loop(&self) -> bool {
        self.adj
            .iter()
            .enumerate()
            .any(|(u, neis)| neis.contains(&(u as NodeId)))
    }
}

/// A weighted hypothesis pairing one query node with one target node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub u: NodeId,
    pub v: NodeId,
    pub weight: f64,
}

/// One row of (seed, node, minimum distance) produced by the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighbourTriple {
    pub seed: NodeId,
    pub node: NodeId,
    pub distance: u32,
}

/// One row produced by the join stage, matching the schema in §3 exactly:
/// (match_start, match_end, query_node_id, target_node_id, query_proximity,
/// target_proximity, delta, misses, totals, weight).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinRecord {
    pub match_start: NodeId,
    pub match_end: NodeId,
    pub query_node_id: NodeId,
    pub target_node_id: Option<NodeId>,
    pub query_proximity: u32,
    pub target_proximity: Option<u32>,
    pub delta: f64,
    pub misses: u32,
    pub totals: u32,
    pub weight: f64,
}

/// A one-to-one (partial) map from query nodes to target nodes; `None`
/// represents the unmatched sentinel `⊥`.
pub type Assignment = Vec<(NodeId, Option<NodeId>)>;

/// Recognized search options (§6). Deserializable from JSON the way the
/// source codebase's sidecar catalogs are, with documented defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Hop radius; integer >= 1.
    pub h: i32,
    /// Proximity discount base, in [0, 1].
    pub alpha: f64,
    /// Number of best assignments to return; integer >= 1.
    pub k: usize,
    /// Iteration cap for the cost-refinement loop.
    pub max_iters: u32,
    /// Convergence tolerance on the maximum per-iteration cost change.
    pub tol: f64,
    /// Unit penalty charged by a miss row.
    pub miss_penalty: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams { h: 2, alpha: 0.3, k: 1, max_iters: 10, tol: 1e-6, miss_penalty: 1.0 }
    }
}

impl MatchParams {
    /// Range-check every field up front so `run_search` fails fast rather
    /// than partway through a join or iteration.
    pub fn validate(&self) -> Result<(), crate::error::MatchError> {
        use crate::error::MatchError;
        if self.h < 1 {
            return Err(MatchError::invalid_argument(format!("h must be >= 1, got {}", self.h)));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MatchError::invalid_argument(format!(
                "alpha must be in [0,1], got {}",
                self.alpha
            )));
        }
        if self.k == 0 {
            return Err(MatchError::invalid_argument("k must be >= 1"));
        }
        if self.tol < 0.0 {
            return Err(MatchError::invalid_argument("tol must be >= 0"));
        }
        if self.miss_penalty < 0.0 {
            return Err(MatchError::invalid_argument("miss_penalty must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_from_edges_is_symmetric_and_deduped() {
        let g = Graph::from_edges(3, &[(0, 1), (1, 0), (1, 2)]);
        assert_eq!(g.neighbours(0), &[1]);
        assert_eq!(g.neighbours(1), &[0, 2]);
        assert_eq!(g.neighbours(2), &[1]);
    }

    #[test]
    fn detects_self_loop() {
        let g = Graph::from_edges(2, &[(0, 0)]);
        assert!(g.has_self_loop());
        let g = Graph::from_edges(2, &[(0, 1)]);
        assert!(!g.has_self_loop());
    }

    #[test]
    fn default_params_match_documented_defaults() {
        let p = MatchParams::default();
        assert_eq!(p.h, 2);
        assert_eq!(p.alpha, 0.3);
        assert_eq!(p.k, 1);
        assert_eq!(p.max_iters, 10);
        assert_eq!(p.tol, 1e-6);
        assert_eq!(p.miss_penalty, 1.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_h_and_alpha_and_k() {
        let mut p = MatchParams::default();
        p.h = 0;
        assert!(p.validate().is_err());
        p.h = 2;
        p.alpha = 1.5;
        assert!(p.validate().is_err());
        p.alpha = 0.3;
        p.k = 0;
        assert!(p.validate().is_err());
    }
}
