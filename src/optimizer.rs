//! Optimizer (§4.4): iterative cost refinement over the Frame followed by
//! branch-and-bound assignment search.
//!
//! The two halves are kept as separate functions ([`refine_costs`] and
//! [`search_assignments`]) so a caller (or a test) can inspect the converged
//! cost map on its own; [`optimize`] wires them together the way
//! `run_search` expects.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{MatchError, MatchResult};
use crate::frame::{delta_plus, Column, Frame};
use crate::types::{Assignment, CandidateMatch, MatchParams, NodeId};

/// Cooperative cancellation flag, checked between iterations and between
/// branch-and-bound expansions. The caller sets it from another thread (or
/// a timer) to implement a timeout; this crate never spawns threads itself.
pub type CancelFlag = Arc<AtomicBool>;

pub fn new_cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

fn check_cancelled(cancel: &CancelFlag) -> MatchResult<()> {
    if cancel.load(AtomicOrdering::Relaxed) {
        return Err(MatchError::Cancelled);
    }
    Ok(())
}

/// Iteratively refines the per-(u,v) cost estimate from the Frame's rows
/// until the maximum change falls below `params.tol` or `params.max_iters`
/// is reached. Mutates the Frame's `proximity` and `delta` scratch columns
/// once, up front (both are static given (h, alpha) and don't depend on the
/// iteration state), then reads them on every pass.
pub fn refine_costs(
    frame: &mut Frame,
    candidates: &[CandidateMatch],
    params: &MatchParams,
    cancel: &CancelFlag,
) -> MatchResult<HashMap<(NodeId, NodeId), f64>> {
    frame.compute_proximity(params.h, params.alpha)?;

    let target_prox_f64: Vec<f64> = frame.target_proximity.iter().map(|d| d.map(|v| v as f64).unwrap_or(0.0)).collect();
    let query_prox_f64: Vec<f64> = frame.query_proximity.iter().map(|&v| v as f64).collect();
    let deltas = delta_plus(&target_prox_f64, &query_prox_f64);
    frame.set("delta", Column::Floats(deltas))?;

    let mut totals_by_group: HashMap<(NodeId, NodeId), u32> = HashMap::new();
    for i in 0..frame.len() {
        totals_by_group.entry((frame.match_start[i], frame.match_end[i])).or_insert(frame.totals[i]);
    }

    let mut cost: HashMap<(NodeId, NodeId), f64> = candidates.iter().map(|c| ((c.u, c.v), 0.0)).collect();

    for iter in 0..params.max_iters {
        check_cancelled(cancel)?;

        let mut sums: HashMap<(NodeId, NodeId), f64> = HashMap::new();
        for i in 0..frame.len() {
            let key = (frame.match_start[i], frame.match_end[i]);
            let contribution = match frame.target_node_id[i] {
                Some(v_prime) => {
                    let c_prime = cost.get(&(frame.query_node_id[i], v_prime)).copied().unwrap_or(0.0);
                    frame.proximity[i] * (frame.delta[i] + c_prime)
                }
                None => frame.proximity[i] * params.miss_penalty,
            };
            *sums.entry(key).or_insert(0.0) += contribution;
        }

        let mut new_cost: HashMap<(NodeId, NodeId), f64> = HashMap::with_capacity(cost.len());
        let mut max_change = 0.0f64;
        for (&key, &old) in &cost {
            let total = totals_by_group.get(&key).copied().unwrap_or(1).max(1) as f64;
            let sum = sums.get(&key).copied().unwrap_or(0.0);
            let updated = sum / total;
            max_change = max_change.max((updated - old).abs());
            new_cost.insert(key, updated);
        }

        debug!(target: "graphmatch::optimizer", "iteration {} max_change={:.6e}", iter, max_change);
        cost = new_cost;
        if max_change < params.tol {
            break;
        }
    }

    Ok(cost)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedF64(f64);
impl Eq for OrderedF64 {}
impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Key used to compare two candidate assignments lexicographically for
/// tie-breaking: by query node id, then by target node id, treating `⊥` as
/// sorting after every real target (an unmatched node is never preferred
/// over a matched one when costs tie).
fn tie_break_key(assignment: &Assignment) -> Vec<(NodeId, NodeId)> {
    assignment.iter().map(|&(u, v)| (u, v.unwrap_or(NodeId::MAX))).collect()
}

fn assignment_cmp(a: &(Assignment, f64), b: &(Assignment, f64)) -> Ordering {
    OrderedF64(a.1).cmp(&OrderedF64(b.1)).then_with(|| tie_break_key(&a.0).cmp(&tie_break_key(&b.0)))
}

fn insert_sorted(results: &mut Vec<(Assignment, f64)>, item: (Assignment, f64), k: usize) {
    let pos = results.partition_point(|existing| assignment_cmp(existing, &item) != Ordering::Greater);
    results.insert(pos, item);
    results.truncate(k);
}

/// Branch-and-bound search over one-to-one assignments (§4.4 "Assignment
/// search"). `query_nodes` must list every node of V_Q exactly once;
/// `cost` is the converged per-(u,v) cost map from [`refine_costs`].
pub fn search_assignments(
    query_nodes: &[NodeId],
    candidates: &[CandidateMatch],
    cost: &HashMap<(NodeId, NodeId), f64>,
    params: &MatchParams,
    cancel: &CancelFlag,
) -> MatchResult<Vec<(Assignment, f64)>> {
    if params.k == 0 {
        return Err(MatchError::invalid_argument("k must be >= 1"));
    }

    // Options per node: every real candidate with its converged cost, plus
    // the fixed-penalty `⊥` option, sorted best-first for early pruning.
    let mut options: HashMap<NodeId, Vec<(Option<NodeId>, f64)>> = HashMap::new();
    for &u in query_nodes {
        options.insert(u, vec![(None, params.miss_penalty)]);
    }
    for c in candidates {
        let entry = options.entry(c.u).or_insert_with(|| vec![(None, params.miss_penalty)]);
        let resolved_cost = cost.get(&(c.u, c.v)).copied().unwrap_or(c.weight);
        entry.push((Some(c.v), resolved_cost));
    }
    for opts in options.values_mut() {
        opts.sort_by(|a, b| OrderedF64(a.1).cmp(&OrderedF64(b.1)));
    }

    let mut order: Vec<NodeId> = query_nodes.to_vec();
    order.sort_by_key(|u| {
        let real_candidates = options[u].iter().filter(|(v, _)| v.is_some()).count();
        (real_candidates, *u)
    });

    let min_cost: HashMap<NodeId, f64> =
        order.iter().map(|&u| (u, options[&u].iter().map(|(_, c)| *c).fold(f64::INFINITY, f64::min))).collect();
    // suffix_min[i] = sum of min_cost for order[i..]
    let mut suffix_min = vec![0.0f64; order.len() + 1];
    for i in (0..order.len()).rev() {
        suffix_min[i] = suffix_min[i + 1] + min_cost[&order[i]];
    }

    let mut results: Vec<(Assignment, f64)> = Vec::new();
    let mut used: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
    let mut partial: Vec<(NodeId, Option<NodeId>)> = Vec::with_capacity(order.len());

    dfs(&order, &options, &suffix_min, 0, &mut used, &mut partial, 0.0, &mut results, params.k, cancel)?;

    results.sort_by(assignment_cmp);
    results.truncate(params.k);
    // Canonicalize each assignment's row order to ascending query node id.
    for (assignment, _) in &mut results {
        assignment.sort_by_key(|&(u, _)| u);
    }
    Ok(results)
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    order: &[NodeId],
    options: &HashMap<NodeId, Vec<(Option<NodeId>, f64)>>,
    suffix_min: &[f64],
    pos: usize,
    used: &mut std::collections::HashSet<NodeId>,
    partial: &mut Vec<(NodeId, Option<NodeId>)>,
    acc_cost: f64,
    results: &mut Vec<(Assignment, f64)>,
    k: usize,
    cancel: &CancelFlag,
) -> MatchResult<()> {
    check_cancelled(cancel)?;

    if pos == order.len() {
        insert_sorted(results, (partial.clone(), acc_cost), k);
        return Ok(());
    }

    let threshold = if results.len() >= k { results[k - 1].1 } else { f64::INFINITY };
    if acc_cost + suffix_min[pos] > threshold + 1e-12 {
        return Ok(());
    }

    let u = order[pos];
    for &(v, row_cost) in &options[&u] {
        if let Some(target) = v {
            if used.contains(&target) {
                continue;
            }
        }
        let next_cost = acc_cost + row_cost;
        let remaining_bound = next_cost + suffix_min[pos + 1];
        let threshold = if results.len() >= k { results[k - 1].1 } else { f64::INFINITY };
        if remaining_bound > threshold + 1e-12 {
            continue;
        }
        if let Some(target) = v {
            used.insert(target);
        }
        partial.push((u, v));
        dfs(order, options, suffix_min, pos + 1, used, partial, next_cost, results, k, cancel)?;
        partial.pop();
        if let Some(target) = v {
            used.remove(&target);
        }
    }
    Ok(())
}

/// Runs cost refinement followed by assignment search; the function
/// `run_search` in the crate root delegates to this after building the
/// Frame.
pub fn optimize(
    frame: &mut Frame,
    query_nodes: &[NodeId],
    candidates: &[CandidateMatch],
    params: &MatchParams,
    cancel: &CancelFlag,
) -> MatchResult<Vec<(Assignment, f64)>> {
    let cost = refine_costs(frame, candidates, params, cancel)?;
    search_assignments(query_nodes, candidates, &cost, params, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JoinRecord;

    fn rec(ms: NodeId, me: NodeId, qid: NodeId, tid: Option<NodeId>, qp: u32, tp: Option<u32>) -> JoinRecord {
        JoinRecord {
            match_start: ms,
            match_end: me,
            query_node_id: qid,
            target_node_id: tid,
            query_proximity: qp,
            target_proximity: tp,
            delta: 0.0,
            misses: 0,
            totals: 0,
            weight: 1.0,
        }
    }

    #[test]
    fn single_candidate_per_node_is_pinned() {
        // Two query nodes, each with exactly one candidate whose cost is
        // far below the miss penalty; the optimal (and only sane) top-1
        // assignment must use both candidates.
        let records = vec![rec(1, 10, 1, Some(10), 0, Some(0)), rec(2, 20, 2, Some(20), 0, Some(0))];
        let mut frame = Frame::new(records).unwrap();
        let candidates = vec![
            CandidateMatch { u: 1, v: 10, weight: 1.0 },
            CandidateMatch { u: 2, v: 20, weight: 1.0 },
        ];
        let params = MatchParams::default();
        let cancel = new_cancel_flag();
        let results = optimize(&mut frame, &[1, 2], &candidates, &params, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, vec![(1, Some(10)), (2, Some(20))]);
    }

    #[test]
    fn empty_candidates_returns_all_bottom_assignment() {
        let mut frame = Frame::new(Vec::new()).unwrap();
        let candidates: Vec<CandidateMatch> = Vec::new();
        let params = MatchParams::default();
        let cancel = new_cancel_flag();
        let results = optimize(&mut frame, &[1, 2, 3], &candidates, &params, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, vec![(1, None), (2, None), (3, None)]);
        assert!((results[0].1 - 3.0 * params.miss_penalty).abs() < 1e-9);
    }

    #[test]
    fn assignments_are_one_to_one_on_real_targets() {
        let records = vec![
            rec(1, 100, 1, Some(100), 0, Some(0)),
            rec(2, 100, 2, Some(100), 0, Some(0)),
            rec(2, 200, 2, Some(200), 0, Some(0)),
        ];
        let mut frame = Frame::new(records).unwrap();
        let candidates = vec![
            CandidateMatch { u: 1, v: 100, weight: 1.0 },
            CandidateMatch { u: 2, v: 100, weight: 1.0 },
            CandidateMatch { u: 2, v: 200, weight: 1.0 },
        ];
        let params = MatchParams { k: 2, ..MatchParams::default() };
        let cancel = new_cancel_flag();
        let results = optimize(&mut frame, &[1, 2], &candidates, &params, &cancel).unwrap();
        for (assignment, _) in &results {
            let used: Vec<NodeId> = assignment.iter().filter_map(|&(_, v)| v).collect();
            let mut seen = std::collections::HashSet::new();
            assert!(used.iter().all(|v| seen.insert(*v)), "target reused within one assignment");
        }
    }

    #[test]
    fn k_zero_is_invalid_argument() {
        let cost = HashMap::new();
        let params = MatchParams { k: 0, ..MatchParams::default() };
        let cancel = new_cancel_flag();
        let err = search_assignments(&[1], &[], &cost, &params, &cancel);
        assert!(matches!(err, Err(MatchError::InvalidArgument { .. })));
    }

    #[test]
    fn cancellation_is_observed() {
        let records = vec![rec(1, 10, 1, Some(10), 0, Some(0))];
        let mut frame = Frame::new(records).unwrap();
        let candidates = vec![CandidateMatch { u: 1, v: 10, weight: 1.0 }];
        let params = MatchParams::default();
        let cancel = new_cancel_flag();
        cancel.store(true, AtomicOrdering::Relaxed);
        let err = optimize(&mut frame, &[1], &candidates, &params, &cancel);
        assert!(matches!(err, Err(MatchError::Cancelled)));
    }
}
