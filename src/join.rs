//! Join stage (§4.2).
//!
//! For every candidate match (u, v), for every query neighbour u' of u
//! within h hops (including u itself), emit one record per target neighbour
//! v' of v that is itself a candidate for u' -- or a single miss record if
//! no such v' exists. Records for one seed candidate are contiguous; the
//! full unpaginated sequence is the concatenation of every contiguous
//! window.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{MatchError, MatchResult};
use crate::expander;
use crate::types::{CandidateMatch, Graph, JoinRecord, NodeId};

/// Runs the join for every candidate in `candidates`, optionally restricted
/// to the half-open window `[lo, hi)` over the full (unpaginated) record
/// sequence. `window`, if supplied, must have exactly two elements with
/// `lo <= hi`; anything else is `MatchError::InvalidArgument`.
pub fn join(
    q: &Graph,
    t: &Graph,
    candidates: &[CandidateMatch],
    h: i32,
    window: Option<&[usize]>,
) -> MatchResult<Vec<JoinRecord>> {
    if h < 1 {
        return Err(MatchError::invalid_argument(format!("h must be >= 1, got {h}")));
    }
    if let Some(w) = window {
        if w.len() != 2 || w[0] > w[1] {
            return Err(MatchError::invalid_argument(format!(
                "pagination window must be a 2-element [lo, hi) with lo <= hi, got {w:?}"
            )));
        }
    }

    // Index candidates by query node so each seed's neighbour lookups are O(1).
    let mut by_query_node: HashMap<NodeId, Vec<&CandidateMatch>> = HashMap::new();
    for c in candidates {
        by_query_node.entry(c.u).or_default().push(c);
    }

    let mut out = Vec::new();
    for seed in candidates {
        let q_neighbours = expander::neighbours(q, seed.u, h)?;
        let t_reach = expander::neighbours(t, seed.v, h)?;
        let t_dist: HashMap<NodeId, u32> =
            t_reach.into_iter().map(|triple| (triple.node, triple.distance)).collect();

        for nt in &q_neighbours {
            let u_prime = nt.node;
            let d_q = nt.distance;
            let images: Vec<(NodeId, u32)> = by_query_node
                .get(&u_prime)
                .into_iter()
                .flatten()
                .filter_map(|c| t_dist.get(&c.v).map(|&d_t| (c.v, d_t)))
                .collect();

            if images.is_empty() {
                out.push(JoinRecord {
                    match_start: seed.u,
                    match_end: seed.v,
                    query_node_id: u_prime,
                    target_node_id: None,
                    query_proximity: d_q,
                    target_proximity: None,
                    delta: 0.0,
                    misses: 0,
                    totals: 0,
                    weight: seed.weight,
                });
            } else {
                for (v_prime, d_t) in images {
                    out.push(JoinRecord {
                        match_start: seed.u,
                        match_end: seed.v,
                        query_node_id: u_prime,
                        target_node_id: Some(v_prime),
                        query_proximity: d_q,
                        target_proximity: Some(d_t),
                        delta: 0.0,
                        misses: 0,
                        totals: 0,
                        weight: seed.weight,
                    });
                }
            }
        }
    }

    debug!(target: "graphmatch::join", "join produced {} records for {} candidates (h={})", out.len(), candidates.len(), h);

    if let Some(w) = window {
        let lo = w[0].min(out.len());
        let hi = w[1].min(out.len());
        return Ok(out[lo..hi].to_vec());
    }
    Ok(out)
}
