//! Frame: the columnar view over join output (§4.3).
//!
//! A Frame is a fixed record of typed columns -- not a dynamic name→column
//! map -- because its schema is closed (Design Note "Column storage"). The
//! struct below holds one `Vec<T>` per JoinRecord field plus the derived
//! `proximity` column; by-name access is a thin, validated convenience layer
//! over those fixed fields, used by callers that want to address a column
//! generically (e.g. a future command surface), not the crate's own
//! internal logic.

use crate::error::{MatchError, MatchResult};
use crate::types::{JoinRecord, NodeId};

/// All column names recognized by [`Frame::get`] / [`Frame::set`]. Anything
/// else is `MatchError::InvalidArgument`.
pub const COLUMN_NAMES: &[&str] = &[
    "match_start",
    "match_end",
    "query_node_id",
    "target_node_id",
    "query_proximity",
    "target_proximity",
    "delta",
    "misses",
    "totals",
    "weight",
    "proximity",
];

/// A column value as returned/accepted by the by-name accessors. Each
/// variant corresponds to exactly one fixed field on [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    NodeIds(Vec<NodeId>),
    OptionNodeIds(Vec<Option<NodeId>>),
    U32s(Vec<u32>),
    Floats(Vec<f64>),
}

/// Column-oriented table over [`JoinRecord`]s, sorted once at construction
/// by (match_start, match_end, query_node_id, delta) and otherwise
/// immutable except for the scratch columns the optimizer rewrites wholesale
/// each iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub match_start: Vec<NodeId>,
    pub match_end: Vec<NodeId>,
    pub query_node_id: Vec<NodeId>,
    pub target_node_id: Vec<Option<NodeId>>,
    pub query_proximity: Vec<u32>,
    pub target_proximity: Vec<Option<u32>>,
    pub delta: Vec<f64>,
    pub misses: Vec<u32>,
    pub totals: Vec<u32>,
    pub weight: Vec<f64>,
    /// Derived from `query_proximity` via [`proximity`]; zero until a caller
    /// (normally the optimizer) computes it for a given (h, alpha).
    pub proximity: Vec<f64>,
}

impl Frame {
    /// Builds a Frame from join output, establishing the canonical sort and
    /// computing the `totals`/`misses` derived columns. `delta` is carried
    /// through unchanged (join stage emits 0.0; the optimizer rewrites it).
    pub fn new(records: Vec<JoinRecord>) -> MatchResult<Self> {
        let n = records.len();
        let mut idx: Vec<usize> = (0..n).collect();
        idx.sort_by(|&a, &b| {
            let ra = &records[a];
            let rb = &records[b];
            (ra.match_start, ra.match_end, ra.query_node_id, OrderedF64(ra.delta)).cmp(&(
                rb.match_start,
                rb.match_end,
                rb.query_node_id,
                OrderedF64(rb.delta),
            ))
        });

        let mut frame = Frame {
            match_start: Vec::with_capacity(n),
            match_end: Vec::with_capacity(n),
            query_node_id: Vec::with_capacity(n),
            target_node_id: Vec::with_capacity(n),
            query_proximity: Vec::with_capacity(n),
            target_proximity: Vec::with_capacity(n),
            delta: Vec::with_capacity(n),
            misses: vec![0; n],
            totals: vec![0; n],
            weight: Vec::with_capacity(n),
            proximity: vec![0.0; n],
        };
        for i in idx {
            let r = &records[i];
            frame.match_start.push(r.match_start);
            frame.match_end.push(r.match_end);
            frame.query_node_id.push(r.query_node_id);
            frame.target_node_id.push(r.target_node_id);
            frame.query_proximity.push(r.query_proximity);
            frame.target_proximity.push(r.target_proximity);
            frame.delta.push(r.delta);
            frame.weight.push(r.weight);
        }
        frame.recompute_totals();
        frame.recompute_misses();
        frame.check_lengths()?;
        Ok(frame)
    }

    pub fn len(&self) -> usize {
        self.match_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.match_start.is_empty()
    }

    /// Recomputes `totals`: the number of distinct `query_node_id` values
    /// sharing the same (match_start, match_end) group as each row.
    fn recompute_totals(&mut self) {
        use std::collections::{HashMap, HashSet};
        let mut seen: HashMap<(NodeId, NodeId), HashSet<NodeId>> = HashMap::new();
        for i in 0..self.len() {
            seen.entry((self.match_start[i], self.match_end[i])).or_default().insert(self.query_node_id[i]);
        }
        for i in 0..self.len() {
            let count = seen[&(self.match_start[i], self.match_end[i])].len() as u32;
            self.totals[i] = count;
        }
    }

    /// Recomputes `misses`: 1 where `target_proximity` is `⊥`, else 0.
    fn recompute_misses(&mut self) {
        for i in 0..self.len() {
            self.misses[i] = u32::from(self.target_proximity[i].is_none());
        }
    }

    /// Derived `proximity` column: `f(h, alpha, query_proximity[i])`.
    pub fn compute_proximity(&mut self, h: i32, alpha: f64) -> MatchResult<()> {
        self.proximity = proximity(h, alpha, &self.query_proximity)?;
        Ok(())
    }

    fn check_lengths(&self) -> MatchResult<()> {
        let n = self.len();
        let lens = [
            self.match_end.len(),
            self.query_node_id.len(),
            self.target_node_id.len(),
            self.query_proximity.len(),
            self.target_proximity.len(),
            self.delta.len(),
            self.misses.len(),
            self.totals.len(),
            self.weight.len(),
            self.proximity.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(MatchError::invariant_violation(format!(
                "Frame columns have inconsistent lengths: match_start={n}, others={lens:?}"
            )));
        }
        Ok(())
    }

    /// Reads a column by name; the schema is closed, so unknown names are
    /// `InvalidArgument`, not an empty result.
    pub fn get(&self, name: &str) -> MatchResult<Column> {
        Ok(match name {
            "match_start" => Column::NodeIds(self.match_start.clone()),
            "match_end" => Column::NodeIds(self.match_end.clone()),
            "query_node_id" => Column::NodeIds(self.query_node_id.clone()),
            "target_node_id" => Column::OptionNodeIds(self.target_node_id.clone()),
            "query_proximity" => Column::U32s(self.query_proximity.clone()),
            "target_proximity" => Column::OptionNodeIds(self.target_proximity.clone()),
            "delta" => Column::Floats(self.delta.clone()),
            "misses" => Column::U32s(self.misses.clone()),
            "totals" => Column::U32s(self.totals.clone()),
            "weight" => Column::Floats(self.weight.clone()),
            "proximity" => Column::Floats(self.proximity.clone()),
            other => return Err(MatchError::invalid_argument(format!("unknown Frame column '{other}'"))),
        })
    }

    /// Replaces a column wholesale; length mismatches and type mismatches
    /// against the column's fixed schema type are both `InvalidArgument`.
    pub fn set(&mut self, name: &str, column: Column) -> MatchResult<()> {
        let n = self.len();
        macro_rules! expect_len {
            ($v:expr) => {{
                if $v.len() != n {
                    return Err(MatchError::invalid_argument(format!(
                        "column '{name}' length {} does not match frame length {n}",
                        $v.len()
                    )));
                }
            }};
        }
        match (name, column) {
            ("match_start", Column::NodeIds(v)) => {
                expect_len!(v);
                self.match_start = v;
            }
            ("match_end", Column::NodeIds(v)) => {
                expect_len!(v);
                self.match_end = v;
            }
            ("query_node_id", Column::NodeIds(v)) => {
                expect_len!(v);
                self.query_node_id = v;
            }
            ("target_node_id", Column::OptionNodeIds(v)) => {
                expect_len!(v);
                self.target_node_id = v;
            }
            ("query_proximity", Column::U32s(v)) => {
                expect_len!(v);
                self.query_proximity = v;
            }
            ("target_proximity", Column::OptionNodeIds(v)) => {
                expect_len!(v);
                self.target_proximity = v;
            }
            ("delta", Column::Floats(v)) => {
                expect_len!(v);
                self.delta = v;
            }
            ("misses", Column::U32s(v)) => {
                expect_len!(v);
                self.misses = v;
            }
            ("totals", Column::U32s(v)) => {
                expect_len!(v);
                self.totals = v;
            }
            ("weight", Column::Floats(v)) => {
                expect_len!(v);
                self.weight = v;
            }
            ("proximity", Column::Floats(v)) => {
                expect_len!(v);
                self.proximity = v;
            }
            (other, _) if !COLUMN_NAMES.contains(&other) => {
                return Err(MatchError::invalid_argument(format!("unknown Frame column '{other}'")));
            }
            (other, _) => {
                return Err(MatchError::invalid_argument(format!(
                    "column '{other}' was written with the wrong value type"
                )));
            }
        }
        Ok(())
    }
}

/// Proximity discount: `alpha^d` for `d <= h`, else 0. Both `h` and `alpha`
/// are validated on every call since this is also a directly testable
/// public function (§8 scenario 6).
pub fn proximity(h: i32, alpha: f64, d: &[u32]) -> MatchResult<Vec<f64>> {
    if h < 0 {
        return Err(MatchError::invalid_argument(format!("h must be >= 0, got {h}")));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(MatchError::invalid_argument(format!("alpha must be in [0,1], got {alpha}")));
    }
    let h = h as u32;
    Ok(d.iter().map(|&di| if di <= h { alpha.powi(di as i32) } else { 0.0 }).collect())
}

/// `delta_plus(a, b)_i = max(a_i - b_i, 0)`.
pub fn delta_plus(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(&x, &y)| (x - y).max(0.0)).collect()
}

/// Total-order wrapper so `f64` delta values can be sorted; NaN never
/// appears in this crate's scratch columns (they are sums of non-negative
/// products), so `partial_cmp` always succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedF64(f64);

impl Eq for OrderedF64 {}
impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}
