//! Inexact subgraph matching: given a (small) query graph, a target graph,
//! and a set of weighted candidate node pairings between them, finds the
//! top-k lowest-cost one-to-one assignments from query nodes to target
//! nodes (or the unmatched sentinel `⊥`).
//!
//! The pipeline is expand -> join -> frame -> optimize, each stage its own
//! module:
//!
//! - [`expander`]: relational BFS from a set of seeds up to a hop radius.
//! - [`join`]: pairs candidate matches with their query/target neighbourhoods.
//! - [`frame`]: the columnar table the join stage feeds into.
//! - [`optimizer`]: iterative cost refinement plus branch-and-bound search.
//!
//! [`provider`] defines the external collaborator traits (`GraphProvider`,
//! `CandidateProvider`) this crate depends on but never implements for real
//! storage; [`run_search`] is the single entry point gluing the stages
//! together for a caller that only has graph ids and a provider pair.

pub mod error;
pub mod expander;
pub mod frame;
pub mod join;
pub mod optimizer;
pub mod provider;
pub mod types;

use error::{MatchError, MatchResult};
use optimizer::CancelFlag;
use provider::{CandidateProvider, GraphProvider};
use types::{Assignment, GraphId, MatchParams};

// Test-only printing helper: expands to tprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(test)]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(test))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => {
        if false { let _ = format!($($arg)*); }
    };
}

/// Runs the full pipeline for one (query_graph, target_graph) pair: resolves
/// both graphs and their candidate matches through the providers, joins,
/// builds a [`frame::Frame`], then refines costs and searches for the
/// top-`params.k` assignments.
///
/// Returns assignments sorted ascending by cost, lexicographic tie-break on
/// (query_node_id, target_node_id) with `⊥` sorting after any real match.
pub fn run_search(
    query_graph: GraphId,
    target_graph: GraphId,
    graphs: &impl GraphProvider,
    candidates: &impl CandidateProvider,
    params: &MatchParams,
    cancel: &CancelFlag,
) -> MatchResult<Vec<(Assignment, f64)>> {
    params.validate()?;

    let q = graphs.adjacency(query_graph)?;
    let t = graphs.adjacency(target_graph)?;
    let cands = candidates.candidates(query_graph, target_graph)?;

    // V_Q is the set of nodes Q actually has -- those with at least one edge
    // or at least one candidate -- not every positional index of the
    // adjacency vector. A `Graph` may be built over a wider index range than
    // it has nodes for (e.g. a 1-indexed id space with an unused slot 0);
    // treating every unused index as a mandatory ⊥-penalised query node
    // would charge miss_penalty for nodes that were never part of Q.
    let mut node_set: std::collections::BTreeSet<types::NodeId> = std::collections::BTreeSet::new();
    for (idx, neighbours) in q.adj.iter().enumerate() {
        if !neighbours.is_empty() {
            node_set.insert(idx as types::NodeId);
        }
    }
    for c in &cands {
        node_set.insert(c.u);
    }
    let query_nodes: Vec<types::NodeId> = node_set.into_iter().collect();

    let records = join::join(&q, &t, &cands, params.h, None)?;
    let mut frame = frame::Frame::new(records)?;

    let results = optimizer::optimize(&mut frame, &query_nodes, &cands, params, cancel)?;
    tracing::info!(
        target: "graphmatch::run_search",
        "search over ({query_graph}, {target_graph}) returned {} assignment(s), best cost {:?}",
        results.len(),
        results.first().map(|(_, cost)| *cost)
    );
    Ok(results)
}
