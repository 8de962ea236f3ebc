//! External collaborator interfaces.
//!
//! The matching core treats graph storage and candidate-match storage as
//! external concerns (§6): it only needs something that can resolve a graph
//! id to an adjacency list, and something that can yield the candidate
//! matches between a query graph and a target graph. This module defines
//! those trait boundaries plus a minimal in-memory reference implementation
//! used by this crate's own tests and benches.

use std::collections::HashMap;

use crate::error::{MatchError, MatchResult};
use crate::types::{CandidateMatch, Graph, GraphId, NodeId};

/// Resolves a graph id to its adjacency list. Implementations own whatever
/// persistence or caching they need; the core only ever reads through this
/// trait and never mutates a graph mid-search (§5).
pub trait GraphProvider {
    fn adjacency(&self, graph_id: GraphId) -> MatchResult<Graph>;
}

/// Yields the weighted candidate matches between a query graph and a target
/// graph. Candidates are externally supplied; the core never invents them.
pub trait CandidateProvider {
    fn candidates(&self, query_graph: GraphId, target_graph: GraphId) -> MatchResult<Vec<CandidateMatch>>;
}

/// Reference `GraphProvider` backed by a fixed table of in-memory graphs,
/// keyed by id. Intended for tests, benches and small embedded callers that
/// don't need a real store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphs {
    graphs: HashMap<GraphId, Graph>,
}

impl InMemoryGraphs {
    pub fn new() -> Self {
        InMemoryGraphs { graphs: HashMap::new() }
    }

    pub fn insert(&mut self, graph_id: GraphId, n: usize, edges: &[(NodeId, NodeId)]) -> &mut Self {
        self.graphs.insert(graph_id, Graph::from_edges(n, edges));
        self
    }
}

impl GraphProvider for InMemoryGraphs {
    fn adjacency(&self, graph_id: GraphId) -> MatchResult<Graph> {
        self.graphs.get(&graph_id).cloned().ok_or_else(|| MatchError::no_such_graph(graph_id))
    }
}

/// Reference `CandidateProvider` backed by a fixed table of (query_graph,
/// target_graph) -> candidate lists.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidates {
    by_pair: HashMap<(GraphId, GraphId), Vec<CandidateMatch>>,
}

impl InMemoryCandidates {
    pub fn new() -> Self {
        InMemoryCandidates { by_pair: HashMap::new() }
    }

    pub fn insert(
        &mut self,
        query_graph: GraphId,
        target_graph: GraphId,
        triples: &[(NodeId, NodeId, f64)],
    ) -> &mut Self {
        let entry = self.by_pair.entry((query_graph, target_graph)).or_default();
        entry.extend(triples.iter().map(|&(u, v, weight)| CandidateMatch { u, v, weight }));
        self
    }
}

impl CandidateProvider for InMemoryCandidates {
    fn candidates(&self, query_graph: GraphId, target_graph: GraphId) -> MatchResult<Vec<CandidateMatch>> {
        Ok(self.by_pair.get(&(query_graph, target_graph)).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_graphs_round_trip() {
        let mut graphs = InMemoryGraphs::new();
        graphs.insert(1, 3, &[(0, 1), (1, 2)]);
        let g = graphs.adjacency(1).unwrap();
        assert_eq!(g.neighbours(1), &[0, 2]);
    }

    #[test]
    fn unknown_graph_id_is_no_such_graph() {
        let graphs = InMemoryGraphs::new();
        assert_eq!(graphs.adjacency(42), Err(MatchError::no_such_graph(42)));
    }

    #[test]
    fn in_memory_candidates_round_trip() {
        let mut cands = InMemoryCandidates::new();
        cands.insert(1, 2, &[(0, 0, 1.0), (0, 1, 0.5)]);
        let out = cands.candidates(1, 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(cands.candidates(1, 99).unwrap(), Vec::new());
    }
}
